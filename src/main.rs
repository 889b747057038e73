use std::fs::File;
use std::io::stdout;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{error, info};
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{Config, WriteLogger};

use pageview::event_source::TerminalEventSource;
use pageview::pdf::MupdfSource;
use pageview::{App, ControllerOptions, DocumentSource, PageViewController, PixelSurface};
use pageview::{panic_handler, run_app_with_event_source, settings};

/// View PDF pages in the terminal
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// PDF file to open
    file: PathBuf,

    /// Initial zoom factor (overrides the config file)
    #[arg(short, long)]
    scale: Option<f64>,

    /// Config file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where to write the log
    #[arg(long, default_value = "pageview.log")]
    log_file: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = settings::load_settings(cli.config.as_deref());
    if let Some(scale) = cli.scale {
        settings.initial_scale = scale;
    }

    WriteLogger::init(
        settings.log_level_filter(),
        Config::default(),
        File::create(&cli.log_file)
            .with_context(|| format!("creating log file {:?}", cli.log_file))?,
    )?;
    info!("Starting pageview on {:?}", cli.file);

    // Load failures are reported before the terminal is taken over.
    let document = MupdfSource.open(&cli.file)?;
    let surface = PixelSurface::new(settings.pixel_ratio);
    let controller =
        PageViewController::initialize(document, surface, ControllerOptions::from(&settings))?;
    let mut app = App::new(controller, settings);

    panic_handler::initialize_panic_handler();
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app_with_event_source(&mut terminal, &mut app, &mut TerminalEventSource);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        error!("Application error: {err:?}");
    }
    info!("Shutting down pageview");
    res
}
