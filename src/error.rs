//! Error taxonomy for the viewer core

use std::path::PathBuf;

/// Errors surfaced by the viewer core and its collaborators
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    /// The document could not be opened
    #[error("failed to open {path:?}: {detail}")]
    Load { path: PathBuf, detail: String },

    /// The document opened but has no pages
    #[error("document has no pages")]
    EmptyDocument,

    /// A page outside `[1, total]` was requested
    #[error("page {page} is out of range (document has {total} pages)")]
    PageRange { page: usize, total: usize },

    /// The renderer failed while drawing a page
    #[error("failed to render page {page}: {detail}")]
    Render { page: usize, detail: String },

    /// Nothing has been painted on the surface yet
    #[error("surface has no rendered content to export")]
    NothingToExport,

    /// Serializing the surface to an image failed
    #[error("image export: {0}")]
    Export(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ViewerError {
    pub fn load(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn render(page: usize, detail: impl Into<String>) -> Self {
        Self::Render {
            page,
            detail: detail.into(),
        }
    }
}

pub type Result<T, E = ViewerError> = std::result::Result<T, E>;
