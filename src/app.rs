//! Terminal host for the page view controller
//!
//! Maps keys and mouse gestures to controller intents, polls render
//! completions and draws the surface with half-block cells.

use std::time::Duration;

use anyhow::Result;
use log::{error, info};
use ratatui::{
    Frame, Terminal,
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use crate::controller::PageViewController;
use crate::document::Document;
use crate::event_source::{
    Event, EventSource, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crate::settings::Settings;
use crate::surface::{PixelSurface, Surface};

const TOP_HALF_BLOCK: &str = "\u{2580}";

pub struct App<D: Document> {
    controller: PageViewController<D, PixelSurface>,
    settings: Settings,
    message: Option<String>,
    should_quit: bool,
}

impl<D: Document> App<D> {
    pub fn new(controller: PageViewController<D, PixelSurface>, settings: Settings) -> Self {
        Self {
            controller,
            settings,
            message: None,
            should_quit: false,
        }
    }

    #[must_use]
    pub fn controller(&self) -> &PageViewController<D, PixelSurface> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut PageViewController<D, PixelSurface> {
        &mut self.controller
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Pick up finished renders
    pub fn tick(&mut self) -> Result<()> {
        self.controller.poll_renders()?;
        Ok(())
    }

    /// Route one terminal event. Errors returned here end the session.
    pub fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            _ => Ok(()),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.kind != crossterm::event::KeyEventKind::Press {
            return Ok(());
        }
        let step = self.settings.zoom_step;
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Left | KeyCode::Char('h' | 'p') => self.controller.go_to_previous_page()?,
            KeyCode::Right | KeyCode::Char('l' | 'n') => self.controller.go_to_next_page()?,
            KeyCode::Char('+' | '=') => self.controller.zoom_in(step)?,
            KeyCode::Char('-') => self.controller.zoom_out(step)?,
            KeyCode::Char('d') => self.export_and_download(),
            _ => {}
        }
        Ok(())
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> Result<()> {
        let (x, y) = self.cell_to_css(mouse.column, mouse.row);
        let alt = mouse.modifiers.contains(KeyModifiers::ALT);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.controller.begin_drag(x, y),
            MouseEventKind::Drag(MouseButton::Left) => self.controller.continue_drag(x, y),
            MouseEventKind::Up(MouseButton::Left) => self.controller.end_drag(),
            MouseEventKind::ScrollUp => self.controller.zoom_on_wheel(alt, 1)?,
            MouseEventKind::ScrollDown => self.controller.zoom_on_wheel(alt, -1)?,
            _ => {}
        }
        Ok(())
    }

    fn cell_to_css(&self, column: u16, row: u16) -> (i32, i32) {
        (
            i32::from(column) * i32::from(self.settings.cell_width_px),
            i32::from(row) * i32::from(self.settings.cell_height_px),
        )
    }

    fn export_and_download(&mut self) {
        let dir = self.settings.resolved_download_dir();
        let result = match self.controller.export_current_page() {
            Ok(_) => self.controller.download_export(&dir),
            Err(e) => Err(e),
        };
        match result {
            Ok(dest) => {
                info!("Saved page image to {dest:?}");
                self.message = Some(format!("saved {}", dest.display()));
            }
            Err(e) => {
                error!("Export failed: {e}");
                self.message = Some(format!("export failed: {e}"));
            }
        }
    }

    pub fn draw(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(f.area());

        f.render_widget(
            SurfaceView {
                surface: self.controller.surface(),
                cell_width_px: self.settings.cell_width_px.max(1),
                cell_height_px: self.settings.cell_height_px.max(2),
            },
            chunks[0],
        );
        f.render_widget(self.status_line(), chunks[1]);
    }

    fn status_line(&self) -> Paragraph<'_> {
        let mut spans = vec![
            Span::styled(
                format!(" {} ", self.controller.page_label()),
                Style::default().fg(Color::Black).bg(Color::Cyan),
            ),
            Span::raw(format!(" {:.0}% ", self.controller.scale() * 100.0)),
        ];
        if self.controller.is_rendering() {
            spans.push(Span::styled(
                " rendering ",
                Style::default().fg(Color::Yellow),
            ));
        }
        if let Some(message) = &self.message {
            spans.push(Span::raw(format!(" {message} ")));
        }
        spans.push(Span::styled(
            " h/l page  +/- zoom  alt+wheel zoom  drag pan  d save  q quit",
            Style::default().fg(Color::DarkGray),
        ));
        Paragraph::new(Line::from(spans))
    }
}

/// Draws the visible part of a surface, two CSS rows per terminal cell
struct SurfaceView<'a> {
    surface: &'a PixelSurface,
    cell_width_px: u16,
    cell_height_px: u16,
}

impl SurfaceView<'_> {
    fn sample(&self, x: i32, y: i32) -> Option<Color> {
        let display = self.surface.display_box();
        let local_x = u32::try_from(x - display.left).ok()?;
        let local_y = u32::try_from(y - display.top).ok()?;
        let [r, g, b, _] = self.surface.sample_css(local_x, local_y)?;
        Some(Color::Rgb(r, g, b))
    }
}

impl Widget for SurfaceView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let cw = i32::from(self.cell_width_px);
        let ch = i32::from(self.cell_height_px);
        for row in 0..area.height {
            for col in 0..area.width {
                let x = i32::from(col) * cw;
                let y = i32::from(row) * ch;
                let top = self.sample(x, y);
                let bottom = self.sample(x, y + ch / 2);
                if top.is_none() && bottom.is_none() {
                    continue;
                }
                if let Some(cell) = buf.cell_mut((area.x + col, area.y + row)) {
                    cell.set_symbol(TOP_HALF_BLOCK)
                        .set_fg(top.unwrap_or(Color::Reset))
                        .set_bg(bottom.unwrap_or(Color::Reset));
                }
            }
        }
    }
}

/// Main loop: poll renders, draw, dispatch events until quit
pub fn run_app_with_event_source<B: ratatui::backend::Backend, D: Document>(
    terminal: &mut Terminal<B>,
    app: &mut App<D>,
    event_source: &mut dyn EventSource,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    let tick_rate = Duration::from_millis(50);
    loop {
        app.tick()?;
        terminal.draw(|f| app.draw(f))?;

        if event_source.poll(tick_rate)? {
            let event = event_source.read()?;
            app.handle_event(event)?;
        }

        if app.should_quit() {
            return Ok(());
        }
    }
}
