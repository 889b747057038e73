// Export modules for use in tests
pub mod app;
pub mod controller;
pub mod document;
pub mod error;
pub mod event_source;
pub mod export;
pub mod panic_handler;
pub mod render_gate;
pub mod settings;
pub mod state;
pub mod surface;

#[cfg(feature = "pdf")]
pub mod pdf;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use app::{App, run_app_with_event_source};
pub use controller::{ControllerOptions, PageViewController};
pub use document::{Document, DocumentSource};
pub use error::ViewerError;
pub use surface::{PixelSurface, Surface};
