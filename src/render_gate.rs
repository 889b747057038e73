//! Render serialization
//!
//! At most one render is in flight. Requests arriving while it runs are
//! coalesced into a single pending slot, last write wins. On completion the
//! pending page (if any) becomes the next in-flight render.

use crate::document::RequestId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct InFlight {
    page: usize,
    /// `None` between admission and the renderer accepting the job
    id: Option<RequestId>,
}

/// Observable phase of the gate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderPhase {
    Idle,
    Rendering { page: usize },
    RenderingWithPending { page: usize, pending: usize },
}

/// Outcome of [`RenderGate::admit`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Nothing was running; the caller must start rendering `page` now
    Start(usize),
    /// A render is running; the page was parked, replacing `replaced`
    Coalesced { replaced: Option<usize> },
}

/// Outcome of [`RenderGate::complete`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// The id does not belong to the in-flight render
    Stale,
    /// Nothing was pending
    Idle,
    /// The pending page was promoted; the caller must start rendering it
    Next(usize),
}

#[derive(Debug, Default)]
pub struct RenderGate {
    in_flight: Option<InFlight>,
    pending: Option<usize>,
}

impl RenderGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn phase(&self) -> RenderPhase {
        match (self.in_flight, self.pending) {
            (None, _) => RenderPhase::Idle,
            (Some(f), None) => RenderPhase::Rendering { page: f.page },
            (Some(f), Some(pending)) => RenderPhase::RenderingWithPending {
                page: f.page,
                pending,
            },
        }
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    #[must_use]
    pub fn pending(&self) -> Option<usize> {
        self.pending
    }

    #[must_use]
    pub fn admit(&mut self, page: usize) -> Admission {
        if self.in_flight.is_some() {
            let replaced = self.pending.replace(page);
            return Admission::Coalesced { replaced };
        }
        self.in_flight = Some(InFlight { page, id: None });
        Admission::Start(page)
    }

    /// Record the id the renderer assigned to the in-flight job
    pub fn bind(&mut self, id: RequestId) {
        if let Some(flight) = self.in_flight.as_mut() {
            flight.id = Some(id);
        }
    }

    #[must_use]
    pub fn owns(&self, id: RequestId) -> bool {
        self.in_flight.is_some_and(|f| f.id == Some(id))
    }

    #[must_use]
    pub fn complete(&mut self, id: RequestId) -> Completion {
        if !self.owns(id) {
            return Completion::Stale;
        }
        self.in_flight = None;
        match self.pending.take() {
            Some(page) => {
                self.in_flight = Some(InFlight { page, id: None });
                Completion::Next(page)
            }
            None => Completion::Idle,
        }
    }

    /// Abandon the in-flight render and drop anything pending.
    /// Returns the dropped pending page.
    pub fn fail(&mut self) -> Option<usize> {
        self.in_flight = None;
        self.pending.take()
    }
}
