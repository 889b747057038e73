//! PDF render worker - runs in a separate thread

use std::path::Path;

use flume::{Receiver, Sender};
use log::{debug, error};
use mupdf::{Colorspace, Document, Matrix, Pixmap};

use crate::document::{Frame, RenderJob, RenderResponse, RequestId};

/// Request sent to the render worker
#[derive(Debug)]
pub enum WorkerRequest {
    Render { id: RequestId, job: RenderJob },

    /// Shutdown the worker
    Shutdown,
}

/// Errors from the render worker
#[derive(Debug, thiserror::Error)]
pub enum WorkerFault {
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    #[error("{detail}")]
    Generic { detail: String },
}

impl WorkerFault {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Main worker function - runs in a dedicated thread
#[expect(
    clippy::needless_pass_by_value,
    reason = "Values moved into thread, need ownership"
)]
pub fn render_worker(
    doc_path: &Path,
    requests: Receiver<WorkerRequest>,
    responses: Sender<RenderResponse>,
) {
    let doc = match Document::open(doc_path.to_string_lossy().as_ref()) {
        Ok(d) => d,
        Err(e) => {
            error!("Render worker could not open {doc_path:?}: {e}");
            let detail = e.to_string();
            for request in requests {
                let WorkerRequest::Render { id, job } = request else {
                    break;
                };
                let _ = responses.send(RenderResponse::Failed {
                    id,
                    page: job.page,
                    detail: detail.clone(),
                });
            }
            return;
        }
    };

    for request in requests {
        match request {
            WorkerRequest::Render { id, job } => {
                let page = job.page;
                let response = match render_page(&doc, &job) {
                    Ok(frame) => RenderResponse::Rendered { id, page, frame },
                    Err(e) => RenderResponse::Failed {
                        id,
                        page,
                        detail: e.to_string(),
                    },
                };
                if responses.send(response).is_err() {
                    break;
                }
            }

            WorkerRequest::Shutdown => break,
        }
    }
    debug!("Render worker for {doc_path:?} exiting");
}

/// Rasterize one page into an RGBA frame
pub fn render_page(doc: &Document, job: &RenderJob) -> Result<Frame, WorkerFault> {
    let index = job
        .page
        .checked_sub(1)
        .ok_or_else(|| WorkerFault::generic("page numbers start at 1"))?;
    let page = doc.load_page(index as i32)?;

    // MuPDF matrices are single precision
    let mag = job.magnification() as f32;
    let transform = Matrix::new_scale(mag, mag);
    let rgb = Colorspace::device_rgb();
    let pixmap = page.to_pixmap(&transform, &rgb, false, true)?;

    pixmap_to_rgba(&pixmap)
}

fn pixmap_to_rgba(pixmap: &Pixmap) -> Result<Frame, WorkerFault> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(WorkerFault::generic(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    if samples.len() < stride.saturating_mul(height) || row_bytes > stride {
        return Err(WorkerFault::generic("Pixmap buffer size mismatch"));
    }

    let mut pixels = Vec::with_capacity(width * height * Frame::CHANNELS);
    for y in 0..height {
        let row_start = y * stride;
        for px in samples[row_start..row_start + row_bytes].chunks_exact(n) {
            let alpha = if n > 3 { px[3] } else { u8::MAX };
            pixels.extend_from_slice(&[px[0], px[1], px[2], alpha]);
        }
    }

    Ok(Frame {
        width: width as u32,
        height: height as u32,
        pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Viewport;

    fn job(page: usize) -> RenderJob {
        RenderJob {
            page,
            viewport: Viewport {
                width: 10.0,
                height: 10.0,
                scale: 1.0,
            },
            transform: None,
            backing_width: 10,
            backing_height: 10,
        }
    }

    #[test]
    fn unopenable_document_fails_requests_then_exits_on_shutdown() {
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();
        let worker = std::thread::spawn(move || {
            render_worker(Path::new("/no/such/file.pdf"), request_rx, response_tx);
        });

        request_tx
            .send(WorkerRequest::Render {
                id: RequestId::new(7),
                job: job(1),
            })
            .unwrap();
        request_tx.send(WorkerRequest::Shutdown).unwrap();
        worker.join().unwrap();

        let responses: Vec<_> = response_rx.try_iter().collect();
        assert_eq!(responses.len(), 1);
        assert!(matches!(
            &responses[0],
            RenderResponse::Failed { page: 1, .. }
        ));
        assert_eq!(responses[0].id(), RequestId::new(7));
    }
}
