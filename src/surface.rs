//! Drawing surface: a backing pixel buffer plus the box it is displayed in

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use crate::document::Frame;
use crate::error::{Result, ViewerError};

/// Displayed box of the surface in CSS pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisplayBox {
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
}

/// 2D drawing target the controller paints pages onto
pub trait Surface {
    /// Device pixels per CSS pixel
    fn pixel_ratio(&self) -> f64;

    /// Resize the backing buffer; existing content is discarded
    fn set_backing_size(&mut self, width: u32, height: u32);

    fn backing_size(&self) -> (u32, u32);

    fn set_display_size(&mut self, width: u32, height: u32);

    fn display_box(&self) -> DisplayBox;

    /// Reposition the displayed box
    fn move_to(&mut self, left: i32, top: i32);

    /// Copy a rendered frame into the backing buffer
    fn paint(&mut self, frame: &Frame);

    /// Serialize the backing buffer as PNG
    fn to_png(&self) -> Result<Vec<u8>>;
}

/// In-memory RGBA surface
#[derive(Debug)]
pub struct PixelSurface {
    backing: RgbaImage,
    display: DisplayBox,
    pixel_ratio: f64,
    painted: bool,
}

impl PixelSurface {
    #[must_use]
    pub fn new(pixel_ratio: f64) -> Self {
        let pixel_ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            pixel_ratio
        } else {
            1.0
        };
        Self {
            backing: RgbaImage::new(0, 0),
            display: DisplayBox::default(),
            pixel_ratio,
            painted: false,
        }
    }

    /// Whether a frame has been painted since the last resize
    #[must_use]
    pub fn is_painted(&self) -> bool {
        self.painted
    }

    /// Sample the backing buffer at a CSS-pixel offset inside the displayed box
    #[must_use]
    pub fn sample_css(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if !self.painted || x >= self.display.width || y >= self.display.height {
            return None;
        }
        let bx = (x as f64 * self.pixel_ratio) as u32;
        let by = (y as f64 * self.pixel_ratio) as u32;
        self.backing
            .get_pixel_checked(bx, by)
            .map(|px| px.0)
    }
}

impl Default for PixelSurface {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Surface for PixelSurface {
    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn set_backing_size(&mut self, width: u32, height: u32) {
        self.backing = RgbaImage::new(width, height);
        self.painted = false;
    }

    fn backing_size(&self) -> (u32, u32) {
        self.backing.dimensions()
    }

    fn set_display_size(&mut self, width: u32, height: u32) {
        self.display.width = width;
        self.display.height = height;
    }

    fn display_box(&self) -> DisplayBox {
        self.display
    }

    fn move_to(&mut self, left: i32, top: i32) {
        self.display.left = left;
        self.display.top = top;
    }

    fn paint(&mut self, frame: &Frame) {
        // Renderers may round the raster a pixel off the backing size; copy the overlap.
        let (bw, bh) = self.backing.dimensions();
        let cols = bw.min(frame.width) as usize;
        let rows = bh.min(frame.height) as usize;
        let src_stride = frame.width as usize * Frame::CHANNELS;
        let dst_stride = bw as usize * Frame::CHANNELS;
        let row_bytes = cols * Frame::CHANNELS;

        let dst: &mut [u8] = &mut self.backing;
        for row in 0..rows {
            let src_start = row * src_stride;
            let Some(src) = frame.pixels.get(src_start..src_start + row_bytes) else {
                break;
            };
            let dst_start = row * dst_stride;
            dst[dst_start..dst_start + row_bytes].copy_from_slice(src);
        }
        self.painted = true;
    }

    fn to_png(&self) -> Result<Vec<u8>> {
        if !self.painted {
            return Err(ViewerError::NothingToExport);
        }
        let mut bytes = Vec::new();
        self.backing
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }
}
