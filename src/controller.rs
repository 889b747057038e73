//! Page view controller
//!
//! Owns the viewer state, the render gate and the export slot, and is the only
//! place that talks to the document and the surface.

use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use crate::document::{Document, RenderJob, RenderResponse, RequestId, Transform};
use crate::error::{Result, ViewerError};
use crate::export::{ExportHandle, ExportSlot, export_file_name};
use crate::render_gate::{Admission, Completion, RenderGate, RenderPhase};
use crate::state::{
    Command, DEFAULT_INITIAL_SCALE, DEFAULT_ZOOM_STEP, Effect, ViewerState, WheelBounds,
};
use crate::surface::Surface;

/// Tunables for a controller
#[derive(Clone, Debug)]
pub struct ControllerOptions {
    pub initial_scale: f64,
    pub zoom_step: f64,
    pub wheel_bounds: WheelBounds,
    /// Directory for exported temp files, system temp dir when `None`
    pub export_dir: Option<PathBuf>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            initial_scale: DEFAULT_INITIAL_SCALE,
            zoom_step: DEFAULT_ZOOM_STEP,
            wheel_bounds: WheelBounds::default(),
            export_dir: None,
        }
    }
}

impl From<&crate::settings::Settings> for ControllerOptions {
    fn from(settings: &crate::settings::Settings) -> Self {
        Self {
            initial_scale: settings.initial_scale,
            zoom_step: settings.zoom_step,
            wheel_bounds: WheelBounds {
                min: settings.wheel_min_scale,
                max: settings.wheel_max_scale,
            },
            export_dir: None,
        }
    }
}

pub struct PageViewController<D: Document, S: Surface> {
    document: D,
    surface: S,
    state: ViewerState,
    gate: RenderGate,
    exports: ExportSlot,
}

impl<D: Document, S: Surface> PageViewController<D, S> {
    /// Take ownership of an opened document and start rendering page 1
    pub fn initialize(document: D, surface: S, options: ControllerOptions) -> Result<Self> {
        let total_pages = document.page_count();
        if total_pages == 0 {
            return Err(ViewerError::EmptyDocument);
        }
        info!(
            "Opened document {:?}: {total_pages} pages, scale {}",
            document.title(),
            options.initial_scale
        );

        let mut state = ViewerState::new(total_pages, options.initial_scale);
        state.zoom_step = options.zoom_step;
        state.wheel_bounds = options.wheel_bounds;

        let exports = match options.export_dir {
            Some(dir) => ExportSlot::in_dir(dir),
            None => ExportSlot::new(),
        };

        let mut controller = Self {
            document,
            surface,
            state,
            gate: RenderGate::new(),
            exports,
        };
        controller.request_render(1)?;
        Ok(controller)
    }

    #[must_use]
    pub fn current_page(&self) -> usize {
        self.state.current_page
    }

    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.state.total_pages
    }

    #[must_use]
    pub fn scale(&self) -> f64 {
        self.state.scale
    }

    #[must_use]
    pub fn page_label(&self) -> String {
        self.state.page_label()
    }

    #[must_use]
    pub fn render_phase(&self) -> RenderPhase {
        self.gate.phase()
    }

    #[must_use]
    pub fn is_rendering(&self) -> bool {
        self.gate.is_busy()
    }

    #[must_use]
    pub fn pending_page(&self) -> Option<usize> {
        self.gate.pending()
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.state.is_dragging()
    }

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[must_use]
    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    #[must_use]
    pub fn current_export(&self) -> Option<&ExportHandle> {
        self.exports.current()
    }

    pub fn go_to_previous_page(&mut self) -> Result<()> {
        self.apply_command(Command::PreviousPage)
    }

    pub fn go_to_next_page(&mut self) -> Result<()> {
        self.apply_command(Command::NextPage)
    }

    pub fn zoom_in(&mut self, step: f64) -> Result<()> {
        self.apply_command(Command::ZoomIn(step))
    }

    pub fn zoom_out(&mut self, step: f64) -> Result<()> {
        self.apply_command(Command::ZoomOut(step))
    }

    /// Zoom by the configured step if the wheel bounds allow it; requires alt
    pub fn zoom_on_wheel(&mut self, alt_pressed: bool, wheel_delta: i32) -> Result<()> {
        self.apply_command(Command::Wheel {
            alt: alt_pressed,
            delta: wheel_delta,
        })
    }

    pub fn begin_drag(&mut self, x: i32, y: i32) {
        let display = self.surface.display_box();
        self.pan(Command::BeginDrag {
            x,
            y,
            surface_left: display.left,
            surface_top: display.top,
        });
    }

    pub fn continue_drag(&mut self, x: i32, y: i32) {
        self.pan(Command::ContinueDrag { x, y });
    }

    pub fn end_drag(&mut self) {
        self.pan(Command::EndDrag);
    }

    fn pan(&mut self, cmd: Command) {
        for effect in self.state.apply(cmd) {
            if let Effect::MoveSurface { left, top } = effect {
                self.surface.move_to(left, top);
            }
        }
    }

    /// Apply a command to the viewer state
    pub fn apply_command(&mut self, cmd: Command) -> Result<()> {
        let effects = self.state.apply(cmd);
        self.execute_effects(effects)
    }

    fn execute_effects(&mut self, effects: Vec<Effect>) -> Result<()> {
        for effect in effects {
            match effect {
                Effect::RequestRender(page) => self.request_render(page)?,
                Effect::MoveSurface { left, top } => self.surface.move_to(left, top),
            }
        }
        Ok(())
    }

    /// Render `page` now, or park it as the single pending request if a
    /// render is already in flight
    pub fn request_render(&mut self, page: usize) -> Result<()> {
        match self.gate.admit(page) {
            Admission::Start(page) => self.start_render(page),
            Admission::Coalesced { replaced } => {
                debug!("Render in flight, parking page {page} (replaced {replaced:?})");
                Ok(())
            }
        }
    }

    fn start_render(&mut self, page: usize) -> Result<()> {
        match self.submit_render(page) {
            Ok(id) => {
                self.gate.bind(id);
                self.state.labeled_page = page;
                debug!("Started render {id:?} for page {page}");
                Ok(())
            }
            Err(e) => {
                let dropped = self.gate.fail();
                error!("Could not start render of page {page}: {e} (dropped pending {dropped:?})");
                Err(e)
            }
        }
    }

    fn submit_render(&mut self, page: usize) -> Result<RequestId> {
        let info = self.document.page(page)?;
        let viewport = info.viewport(self.state.scale);
        let ratio = self.surface.pixel_ratio();

        let backing_width = (viewport.width * ratio).floor() as u32;
        let backing_height = (viewport.height * ratio).floor() as u32;
        self.surface.set_backing_size(backing_width, backing_height);
        self.surface
            .set_display_size(viewport.width.floor() as u32, viewport.height.floor() as u32);

        let transform =
            ((ratio - 1.0).abs() > f64::EPSILON).then(|| Transform::uniform_scale(ratio));

        self.document.start_render(RenderJob {
            page,
            viewport,
            transform,
            backing_width,
            backing_height,
        })
    }

    /// Drain finished renders from the document. Returns how many were handled.
    pub fn poll_renders(&mut self) -> Result<usize> {
        let responses = self.document.poll_completed();
        let count = responses.len();
        for response in responses {
            self.handle_render_response(response)?;
        }
        Ok(count)
    }

    /// Apply one completion signal
    pub fn handle_render_response(&mut self, response: RenderResponse) -> Result<()> {
        let id = response.id();
        if !self.gate.owns(id) {
            warn!(
                "Dropping completion {id:?} for page {}: not in flight",
                response.page()
            );
            return Ok(());
        }

        match response {
            RenderResponse::Rendered { page, frame, .. } => {
                self.surface.paint(&frame);
                debug!("Finished render {id:?} for page {page}");
                match self.gate.complete(id) {
                    Completion::Next(next) => self.start_render(next),
                    Completion::Idle | Completion::Stale => Ok(()),
                }
            }
            RenderResponse::Failed { page, detail, .. } => {
                let dropped = self.gate.fail();
                error!("Render of page {page} failed: {detail} (dropped pending {dropped:?})");
                Err(ViewerError::render(page, detail))
            }
        }
    }

    /// Serialize the surface to PNG, releasing the previous export first
    pub fn export_current_page(&mut self) -> Result<&ExportHandle> {
        let png = self.surface.to_png()?;
        self.exports.replace(&png)
    }

    /// Copy the live export into `dir` under a name derived from the document
    pub fn download_export(&self, dir: &Path) -> Result<PathBuf> {
        let handle = self.exports.current().ok_or(ViewerError::NothingToExport)?;
        let name = export_file_name(self.document.title().as_deref(), self.state.labeled_page);
        let dest = handle.copy_to(&dir.join(name))?;
        info!("Downloaded export #{} to {dest:?}", handle.serial());
        Ok(dest)
    }
}

impl<D: Document, S: Surface> Drop for PageViewController<D, S> {
    fn drop(&mut self) {
        if let Err(e) = self.exports.release_current() {
            warn!("Failed to release export on teardown: {e}");
        }
    }
}
