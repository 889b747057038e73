//! Viewer state: navigation, scale and drag
//!
//! User intents come in as [`Command`]s and produce [`Effect`]s for the
//! controller to execute. Nothing in here talks to the document or the surface.

/// Zoom step used by buttons and the wheel
pub const DEFAULT_ZOOM_STEP: f64 = 0.1;
/// Scale below which the wheel stops zooming out
pub const WHEEL_MIN_SCALE: f64 = 0.5;
/// Scale at or above which the wheel stops zooming in
pub const WHEEL_MAX_SCALE: f64 = 2.0;
/// Scale a freshly opened document is shown at
pub const DEFAULT_INITIAL_SCALE: f64 = 0.8;

/// Limits the wheel applies before zooming
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WheelBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for WheelBounds {
    fn default() -> Self {
        Self {
            min: WHEEL_MIN_SCALE,
            max: WHEEL_MAX_SCALE,
        }
    }
}

/// Pointer offset inside the surface recorded when a drag starts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DragOrigin {
    pub x: i32,
    pub y: i32,
}

/// Per-document view state
#[derive(Clone, Debug)]
pub struct ViewerState {
    /// Current page (1-based)
    pub current_page: usize,

    /// Total page count, fixed at load
    pub total_pages: usize,

    /// Current scale factor
    pub scale: f64,

    /// Page most recently sent to the renderer, shown in the page label
    pub labeled_page: usize,

    pub zoom_step: f64,
    pub wheel_bounds: WheelBounds,

    drag: Option<DragOrigin>,
}

impl ViewerState {
    #[must_use]
    pub fn new(total_pages: usize, scale: f64) -> Self {
        Self {
            current_page: 1,
            total_pages,
            scale,
            labeled_page: 1,
            zoom_step: DEFAULT_ZOOM_STEP,
            wheel_bounds: WheelBounds::default(),
            drag: None,
        }
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    #[must_use]
    pub fn drag_origin(&self) -> Option<DragOrigin> {
        self.drag
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::PreviousPage => {
                if self.current_page <= 1 {
                    return vec![];
                }
                self.current_page -= 1;
                vec![Effect::RequestRender(self.current_page)]
            }

            Command::NextPage => {
                if self.current_page >= self.total_pages {
                    return vec![];
                }
                self.current_page += 1;
                vec![Effect::RequestRender(self.current_page)]
            }

            Command::ZoomIn(step) => {
                self.scale += step;
                vec![Effect::RequestRender(self.current_page)]
            }

            Command::ZoomOut(step) => {
                self.scale -= step;
                vec![Effect::RequestRender(self.current_page)]
            }

            Command::Wheel { alt, delta } => {
                if !alt {
                    return vec![];
                }
                // Bounds are checked before stepping; the result may overshoot by one step.
                if delta > 0 && self.scale < self.wheel_bounds.max {
                    self.apply(Command::ZoomIn(self.zoom_step))
                } else if delta < 0 && self.scale > self.wheel_bounds.min {
                    self.apply(Command::ZoomOut(self.zoom_step))
                } else {
                    vec![]
                }
            }

            Command::BeginDrag {
                x,
                y,
                surface_left,
                surface_top,
            } => {
                self.drag = Some(DragOrigin {
                    x: x - surface_left,
                    y: y - surface_top,
                });
                vec![]
            }

            Command::ContinueDrag { x, y } => match self.drag {
                Some(origin) => vec![Effect::MoveSurface {
                    left: x - origin.x,
                    top: y - origin.y,
                }],
                None => vec![],
            },

            Command::EndDrag => {
                self.drag = None;
                vec![]
            }
        }
    }

    /// "N / total" label for the status line
    #[must_use]
    pub fn page_label(&self) -> String {
        format!("{} / {}", self.labeled_page, self.total_pages)
    }
}

/// Commands that modify viewer state
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    PreviousPage,
    NextPage,
    ZoomIn(f64),
    ZoomOut(f64),
    /// Wheel turn; positive delta zooms in
    Wheel { alt: bool, delta: i32 },
    BeginDrag {
        x: i32,
        y: i32,
        surface_left: i32,
        surface_top: i32,
    },
    ContinueDrag { x: i32, y: i32 },
    EndDrag,
}

/// Effects produced by state changes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Render the given page at the current scale
    RequestRender(usize),
    /// Reposition the displayed surface
    MoveSurface { left: i32, top: i32 },
}
