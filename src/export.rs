//! Exported page images
//!
//! At most one exported image is alive at a time. It is backed by a temporary
//! file which is deleted before the next export creates its own.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::{debug, warn};
use regex::Regex;
use tempfile::TempPath;

use crate::error::Result;

/// A live exported image
#[derive(Debug)]
pub struct ExportHandle {
    path: TempPath,
    serial: u64,
    len: usize,
}

impl ExportHandle {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Monotonic export number, starting at 1
    #[must_use]
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Size of the encoded image in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy the image somewhere permanent
    pub fn copy_to(&self, dest: &Path) -> Result<PathBuf> {
        std::fs::copy(&self.path, dest)?;
        Ok(dest.to_path_buf())
    }

    fn release(self) -> std::io::Result<()> {
        debug!("Releasing export #{} at {:?}", self.serial, &*self.path);
        self.path.close()
    }
}

/// Holder of the single live export
#[derive(Debug, Default)]
pub struct ExportSlot {
    dir: Option<PathBuf>,
    current: Option<ExportHandle>,
    next_serial: u64,
    released: u64,
}

impl ExportSlot {
    /// Slot that keeps its files in the system temp dir
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot that keeps its files in `dir`
    #[must_use]
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<&ExportHandle> {
        self.current.as_ref()
    }

    /// Number of handles released so far
    #[must_use]
    pub fn released(&self) -> u64 {
        self.released
    }

    /// Release the live handle (if any), then store `bytes` as the new one
    pub fn replace(&mut self, bytes: &[u8]) -> Result<&ExportHandle> {
        self.release_current()?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("pageview-").suffix(".png");
        let mut file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(bytes)?;
        file.flush()?;

        self.next_serial += 1;
        let handle = ExportHandle {
            path: file.into_temp_path(),
            serial: self.next_serial,
            len: bytes.len(),
        };
        debug!(
            "Created export #{} at {:?} ({} bytes)",
            handle.serial,
            handle.path(),
            handle.len
        );
        Ok(self.current.insert(handle))
    }

    /// Release the live handle, if any
    pub fn release_current(&mut self) -> Result<()> {
        if let Some(previous) = self.current.take() {
            let serial = previous.serial;
            if let Err(e) = previous.release() {
                warn!("Failed to release export #{serial}: {e}");
                return Err(e.into());
            }
            self.released += 1;
        }
        Ok(())
    }
}

static INVALID_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).expect("Failed to compile invalid chars regex")
});

static RESERVED_NAMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(CON|PRN|AUX|NUL|COM[1-9]|LPT[1-9])$")
        .expect("Failed to compile reserved names regex")
});

/// Sanitize a filename for cross-platform compatibility
pub fn sanitize_filename(name: &str) -> String {
    let sanitized = INVALID_CHARS.replace_all(name, "_");
    let sanitized = sanitized.trim_matches(|c: char| c == ' ' || c == '.');

    if RESERVED_NAMES.is_match(sanitized) {
        return format!("_{sanitized}");
    }

    let sanitized: String = sanitized.chars().take(120).collect();
    if sanitized.is_empty() {
        "untitled".to_string()
    } else {
        sanitized
    }
}

/// Download name for an exported page, e.g. `report-page-3.png`
#[must_use]
pub fn export_file_name(title: Option<&str>, page: usize) -> String {
    let stem = sanitize_filename(title.unwrap_or("page"));
    format!("{stem}-page-{page}.png")
}
