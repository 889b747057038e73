pub mod test_helpers {
    use std::collections::VecDeque;

    use crate::document::{
        Document, Frame, PageInfo, RenderJob, RenderResponse, RequestId, check_page_range,
    };
    use crate::error::{Result, ViewerError};

    /// In-memory document whose renders finish only when the test says so
    pub struct ScriptedDocument {
        pages: Vec<(f64, f64)>,
        title: Option<String>,
        next_id: u64,
        started: Vec<RenderJob>,
        running: VecDeque<(RequestId, RenderJob)>,
        finished: Vec<RenderResponse>,
        fail_next_start: bool,
        fill: [u8; 4],
    }

    impl ScriptedDocument {
        /// `count` US-letter pages
        pub fn letter(count: usize) -> Self {
            Self::with_pages(vec![(612.0, 792.0); count])
        }

        pub fn with_pages(pages: Vec<(f64, f64)>) -> Self {
            Self {
                pages,
                title: None,
                next_id: 1,
                started: Vec::new(),
                running: VecDeque::new(),
                finished: Vec::new(),
                fail_next_start: false,
                fill: [255, 255, 255, 255],
            }
        }

        pub fn titled(mut self, title: &str) -> Self {
            self.title = Some(title.to_string());
            self
        }

        /// Every job ever started, in order
        pub fn started(&self) -> &[RenderJob] {
            &self.started
        }

        pub fn started_pages(&self) -> Vec<usize> {
            self.started.iter().map(|job| job.page).collect()
        }

        pub fn running_count(&self) -> usize {
            self.running.len()
        }

        /// Make the next `start_render` fail
        pub fn fail_next_start(&mut self) {
            self.fail_next_start = true;
        }

        pub fn set_fill(&mut self, rgba: [u8; 4]) {
            self.fill = rgba;
        }

        /// Complete the oldest running render successfully
        pub fn finish_next(&mut self) -> Option<RequestId> {
            let (id, job) = self.running.pop_front()?;
            self.finished.push(RenderResponse::Rendered {
                id,
                page: job.page,
                frame: Frame::filled(job.backing_width, job.backing_height, self.fill),
            });
            Some(id)
        }

        /// Complete the oldest running render with an error
        pub fn fail_next(&mut self, detail: &str) -> Option<RequestId> {
            let (id, job) = self.running.pop_front()?;
            self.finished.push(RenderResponse::Failed {
                id,
                page: job.page,
                detail: detail.to_string(),
            });
            Some(id)
        }

        /// Queue an arbitrary response, e.g. one for an unknown id
        pub fn push_response(&mut self, response: RenderResponse) {
            self.finished.push(response);
        }
    }

    impl Document for ScriptedDocument {
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
            if std::mem::take(&mut self.fail_next_start) {
                return Err(ViewerError::render(job.page, "scripted start failure"));
            }
            let id = RequestId::new(self.next_id);
            self.next_id += 1;
            self.started.push(job.clone());
            self.running.push_back((id, job));
            Ok(id)
        }

        fn poll_completed(&mut self) -> Vec<RenderResponse> {
            std::mem::take(&mut self.finished)
        }

        fn title(&self) -> Option<String> {
            self.title.clone()
        }
    }
}
