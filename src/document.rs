//! Document collaborator contract
//!
//! A [`Document`] exposes page geometry synchronously and renders
//! asynchronously: [`Document::start_render`] hands a job to the renderer and
//! returns immediately, the finished frame shows up later in
//! [`Document::poll_completed`].

use std::path::Path;

use crate::error::Result;

/// Unique identifier for render requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Page rectangle at a given scale, in CSS pixels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scale: f64,
}

/// Unscaled page geometry
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageInfo {
    /// Page number (1-based)
    pub number: usize,
    /// Page width at scale 1.0
    pub width: f64,
    /// Page height at scale 1.0
    pub height: f64,
}

impl PageInfo {
    #[must_use]
    pub fn viewport(&self, scale: f64) -> Viewport {
        Viewport {
            width: self.width * scale,
            height: self.height * scale,
            scale,
        }
    }
}

/// Affine transform applied on top of the viewport, `[a, b, c, d, e, f]`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform(pub [f64; 6]);

impl Transform {
    #[must_use]
    pub const fn uniform_scale(factor: f64) -> Self {
        Self([factor, 0.0, 0.0, factor, 0.0, 0.0])
    }

    /// Scale factor along x
    #[must_use]
    pub const fn scale_x(&self) -> f64 {
        self.0[0]
    }
}

/// Everything the renderer needs to rasterize one page
#[derive(Clone, Debug, PartialEq)]
pub struct RenderJob {
    pub page: usize,
    pub viewport: Viewport,
    /// Device pixel ratio transform, `None` when the ratio is 1
    pub transform: Option<Transform>,
    /// Backing buffer size the frame must fill
    pub backing_width: u32,
    pub backing_height: u32,
}

impl RenderJob {
    /// Effective magnification from page units to backing pixels
    #[must_use]
    pub fn magnification(&self) -> f64 {
        let ratio = self.transform.map_or(1.0, |t| t.scale_x());
        self.viewport.scale * ratio
    }
}

/// Rasterized page, RGBA8 rows without padding
#[derive(Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Frame {
    /// Bytes per pixel
    pub const CHANNELS: usize = 4;

    /// Solid frame, mostly useful for tests and placeholders
    #[must_use]
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let len = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(len * Self::CHANNELS);
        for _ in 0..len {
            pixels.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            pixels,
        }
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Completion signal for a started render
#[derive(Debug)]
pub enum RenderResponse {
    Rendered {
        id: RequestId,
        page: usize,
        frame: Frame,
    },
    Failed {
        id: RequestId,
        page: usize,
        detail: String,
    },
}

impl RenderResponse {
    #[must_use]
    pub fn id(&self) -> RequestId {
        match self {
            Self::Rendered { id, .. } | Self::Failed { id, .. } => *id,
        }
    }

    #[must_use]
    pub fn page(&self) -> usize {
        match self {
            Self::Rendered { page, .. } | Self::Failed { page, .. } => *page,
        }
    }
}

/// An opened document
pub trait Document {
    fn page_count(&self) -> usize;

    /// Look up a page by 1-based number
    fn page(&self, number: usize) -> Result<PageInfo>;

    /// Start rendering; the result arrives through [`Document::poll_completed`]
    fn start_render(&mut self, job: RenderJob) -> Result<RequestId>;

    /// Drain completions in the order their renders were started
    fn poll_completed(&mut self) -> Vec<RenderResponse>;

    /// Human readable name used for exported files
    fn title(&self) -> Option<String> {
        None
    }
}

/// Something that can open documents
pub trait DocumentSource {
    type Doc: Document;

    fn open(&self, locator: &Path) -> Result<Self::Doc>;
}

/// Bounds check shared by [`Document`] implementations
pub fn check_page_range(page: usize, total: usize) -> Result<()> {
    if page == 0 || page > total {
        return Err(crate::error::ViewerError::PageRange { page, total });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_scales_both_axes() {
        let info = PageInfo {
            number: 1,
            width: 612.0,
            height: 792.0,
        };
        let vp = info.viewport(0.5);
        assert_eq!(vp.width, 306.0);
        assert_eq!(vp.height, 396.0);
        assert_eq!(vp.scale, 0.5);
    }

    #[test]
    fn magnification_includes_pixel_ratio() {
        let job = RenderJob {
            page: 1,
            viewport: Viewport {
                width: 100.0,
                height: 100.0,
                scale: 1.5,
            },
            transform: Some(Transform::uniform_scale(2.0)),
            backing_width: 300,
            backing_height: 300,
        };
        assert!((job.magnification() - 3.0).abs() < f64::EPSILON);

        let plain = RenderJob {
            transform: None,
            ..job
        };
        assert!((plain.magnification() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn page_range_rejects_zero_and_past_end() {
        assert!(check_page_range(1, 3).is_ok());
        assert!(check_page_range(3, 3).is_ok());
        assert!(check_page_range(0, 3).is_err());
        assert!(check_page_range(4, 3).is_err());
    }
}
