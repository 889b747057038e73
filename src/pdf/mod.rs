//! MuPDF-backed document source
//!
//! Geometry is read once on open. Rasterization happens on a dedicated worker
//! thread that owns its own MuPDF handle; jobs and completions travel over
//! flume channels and complete in submission order.

mod worker;

use std::path::{Path, PathBuf};

use flume::{Receiver, Sender};
use std::thread::JoinHandle;

use log::{debug, info, warn};

use crate::document::{
    Document, DocumentSource, PageInfo, RenderJob, RenderResponse, RequestId, check_page_range,
};
use crate::error::{Result, ViewerError};

pub use worker::{WorkerFault, WorkerRequest, render_page};
use worker::render_worker;

/// Opens PDF files with MuPDF
#[derive(Clone, Copy, Debug, Default)]
pub struct MupdfSource;

impl DocumentSource for MupdfSource {
    type Doc = MupdfDocument;

    fn open(&self, locator: &Path) -> Result<MupdfDocument> {
        MupdfDocument::open(locator)
    }
}

/// An opened PDF with its render worker
pub struct MupdfDocument {
    path: PathBuf,
    pages: Vec<(f64, f64)>,
    title: Option<String>,
    request_tx: Sender<WorkerRequest>,
    response_rx: Receiver<RenderResponse>,
    worker: Option<JoinHandle<()>>,
    next_request_id: u64,
}

impl MupdfDocument {
    pub fn open(path: &Path) -> Result<Self> {
        let load_err = |e: mupdf::error::Error| ViewerError::load(path, e.to_string());

        let doc = mupdf::Document::open(path.to_string_lossy().as_ref()).map_err(load_err)?;
        let page_count = doc.page_count().map_err(load_err)?;
        let page_count = usize::try_from(page_count).unwrap_or(0);

        let mut pages = Vec::with_capacity(page_count);
        for index in 0..page_count {
            let page = doc.load_page(index as i32).map_err(load_err)?;
            let bounds = page.bounds().map_err(load_err)?;
            pages.push((
                f64::from(bounds.x1 - bounds.x0),
                f64::from(bounds.y1 - bounds.y0),
            ));
        }

        let title = doc
            .metadata(mupdf::MetadataName::Title)
            .ok()
            .filter(|t| !t.is_empty());
        info!("Loaded {path:?}: {page_count} pages, title {title:?}");

        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();
        let worker_path = path.to_path_buf();
        let worker = std::thread::Builder::new()
            .name("pageview-render".to_string())
            .spawn(move || render_worker(&worker_path, request_rx, response_tx))?;

        Ok(Self {
            path: path.to_path_buf(),
            pages,
            title,
            request_tx,
            response_rx,
            worker: Some(worker),
            next_request_id: 1,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl Document for MupdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, number: usize) -> Result<PageInfo> {
        check_page_range(number, self.pages.len())?;
        let (width, height) = self.pages[number - 1];
        Ok(PageInfo {
            number,
            width,
            height,
        })
    }

    fn start_render(&mut self, job: RenderJob) -> Result<RequestId> {
        let id = self.next_id();
        let page = job.page;
        self.request_tx
            .send(WorkerRequest::Render { id, job })
            .map_err(|_| ViewerError::render(page, "render worker has stopped"))?;
        debug!("Queued {id:?} for page {page}");
        Ok(id)
    }

    fn poll_completed(&mut self) -> Vec<RenderResponse> {
        self.response_rx.try_iter().collect()
    }

    fn title(&self) -> Option<String> {
        self.title.clone().or_else(|| {
            self.path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
    }
}

impl Drop for MupdfDocument {
    fn drop(&mut self) {
        if self.request_tx.send(WorkerRequest::Shutdown).is_err() {
            debug!("Render worker already stopped");
        }
        // Renders queued ahead of the shutdown finish first
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Render worker panicked");
            }
        }
    }
}
