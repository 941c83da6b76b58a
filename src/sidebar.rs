//! Sidebar width controller
//!
//! Dragging the resize handle only moves the handle visually (a transform);
//! the width is committed once, on pointer-up. Window resizes re-clamp the
//! committed width against the new container size.

use log::{debug, trace};
use serde::Serialize;

use crate::event_bus::{BusEvent, ResizeSource};
use crate::l10n::TextDirection;

/// CSS custom property holding the committed width
pub const SIDEBAR_WIDTH_VAR: &str = "--sidebar-width";
/// Narrowest allowed sidebar, in pixels
pub const SIDEBAR_MIN_WIDTH: f64 = 200.0;
/// Class disabling transitions on the outer container while resizing
pub const SIDEBAR_RESIZING_CLASS: &str = "sidebarResizing";

const PRIMARY_BUTTON: i16 = 0;

/// Measurements of the element enclosing both sidebar and viewer
pub trait ContainerMetrics {
    fn client_width(&self) -> f64;

    /// Left edge of the container's bounding box
    fn left(&self) -> f64;
}

/// Fixed measurements, for hosts that already know the layout
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StaticMetrics {
    pub width: f64,
    pub left: f64,
}

impl ContainerMetrics for StaticMetrics {
    fn client_width(&self) -> f64 {
        self.width
    }

    fn left(&self) -> f64 {
        self.left
    }
}

/// Inputs the controller reacts to
#[derive(Clone, Debug, PartialEq)]
pub enum SidebarCommand {
    /// Pointer pressed on the resize handle
    PointerDown { button: i16, client_x: f64 },
    /// Window-level pointer move while dragging
    PointerMove { client_x: f64 },
    /// Window-level pointer release while dragging
    PointerUp,
    /// A bus notification (`resize`, `sidebarviewchanged`)
    Notify(BusEvent),
    /// The localization service reported the layout direction
    SetDirection(TextDirection),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum SidebarEffect {
    /// Write `SIDEBAR_WIDTH_VAR` on the document style root
    CommitWidth { width: f64 },
    /// Visual-only drag feedback on the handle
    TranslateResizer { x: f64 },
    /// Drop the handle's inline style on the next animation frame
    ClearResizerStyle,
    AddResizingClass,
    RemoveResizingClass,
    /// Start listening for window pointer move/up
    CapturePointer,
    ReleasePointer,
    Dispatch { event: BusEvent },
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Drag {
    init_left: f64,
    init_width: f64,
    latest_width: f64,
}

#[derive(Clone, Debug, Default)]
pub struct SidebarResizer {
    direction: TextDirection,
    sidebar_open: bool,
    width: Option<f64>,
    outer_container_width: Option<f64>,
    drag: Option<Drag>,
}

impl SidebarResizer {
    pub fn new(direction: TextDirection) -> Self {
        Self {
            direction,
            ..Self::default()
        }
    }

    /// Last committed width, if the sidebar was ever resized
    pub fn width(&self) -> Option<f64> {
        self.width
    }

    pub fn is_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn direction(&self) -> TextDirection {
        self.direction
    }

    fn outer_container_width(&mut self, metrics: &dyn ContainerMetrics) -> f64 {
        *self
            .outer_container_width
            .get_or_insert_with(|| metrics.client_width())
    }

    /// Clamp to `[SIDEBAR_MIN_WIDTH, floor(outer / 2)]`, the minimum winning
    /// when the container is too narrow for both
    pub fn clamp_width(width: f64, outer_container_width: f64) -> f64 {
        let max_width = (outer_container_width / 2.0).floor();
        let width = if width.is_nan() { 0.0 } else { width };
        width.min(max_width).max(SIDEBAR_MIN_WIDTH)
    }

    /// Pointer position converted to a sidebar width
    fn pointer_width(
        &mut self,
        client_x: f64,
        init_left: f64,
        metrics: &dyn ContainerMetrics,
    ) -> f64 {
        let width = client_x - init_left;
        if self.direction.is_rtl() {
            self.outer_container_width(metrics) - width
        } else {
            width
        }
    }

    /// Commit `width`, returns whether the committed value changed
    fn commit_width(
        &mut self,
        width: f64,
        metrics: &dyn ContainerMetrics,
        effects: &mut Vec<SidebarEffect>,
    ) -> bool {
        let width = Self::clamp_width(width, self.outer_container_width(metrics));
        if self.width == Some(width) {
            return false;
        }
        self.width = Some(width);
        effects.push(SidebarEffect::CommitWidth { width });
        true
    }

    #[must_use]
    pub fn apply(
        &mut self,
        cmd: SidebarCommand,
        metrics: &dyn ContainerMetrics,
    ) -> Vec<SidebarEffect> {
        match cmd {
            SidebarCommand::PointerDown { button, client_x } => {
                if button != PRIMARY_BUTTON {
                    return vec![];
                }
                let init_left = metrics.left();
                let init_width = self.pointer_width(client_x, init_left, metrics);
                self.drag = Some(Drag {
                    init_left,
                    init_width,
                    latest_width: init_width,
                });
                debug!("Sidebar resize started at width {init_width}");
                vec![SidebarEffect::AddResizingClass, SidebarEffect::CapturePointer]
            }

            SidebarCommand::PointerMove { client_x } => {
                let Some(drag) = self.drag else {
                    return vec![];
                };
                let width = self.pointer_width(client_x, drag.init_left, metrics);
                let clamped = Self::clamp_width(width, self.outer_container_width(metrics));
                let sign = if self.direction.is_rtl() { -1.0 } else { 1.0 };
                self.drag = Some(Drag {
                    latest_width: width,
                    ..drag
                });
                trace!("Sidebar resize simulated at width {clamped}");
                vec![SidebarEffect::TranslateResizer {
                    x: sign * (clamped - drag.init_width),
                }]
            }

            SidebarCommand::PointerUp => {
                let Some(drag) = self.drag.take() else {
                    return vec![];
                };
                let mut effects = Vec::new();
                self.commit_width(drag.latest_width, metrics, &mut effects);
                debug!("Sidebar resize finished at width {:?}", self.width);
                effects.extend([
                    SidebarEffect::RemoveResizingClass,
                    SidebarEffect::Dispatch {
                        event: BusEvent::Resize {
                            source: ResizeSource::Sidebar,
                        },
                    },
                    SidebarEffect::ReleasePointer,
                    SidebarEffect::ClearResizerStyle,
                ]);
                effects
            }

            SidebarCommand::Notify(BusEvent::SidebarViewChanged { view }) => {
                self.sidebar_open = view.is_some();
                vec![]
            }

            SidebarCommand::Notify(BusEvent::Resize {
                source: ResizeSource::Window,
            }) => self.window_resized(metrics),

            SidebarCommand::Notify(_) => vec![],

            SidebarCommand::SetDirection(direction) => {
                self.direction = direction;
                vec![]
            }
        }
    }

    fn window_resized(&mut self, metrics: &dyn ContainerMetrics) -> Vec<SidebarEffect> {
        self.outer_container_width = None;

        let Some(width) = self.width else {
            return vec![];
        };
        let mut effects = Vec::new();
        if !self.sidebar_open {
            self.commit_width(width, metrics, &mut effects);
            return effects;
        }

        effects.push(SidebarEffect::AddResizingClass);
        let updated = self.commit_width(width, metrics, &mut effects);
        effects.push(SidebarEffect::RemoveResizingClass);
        if updated {
            effects.push(SidebarEffect::Dispatch {
                event: BusEvent::Resize {
                    source: ResizeSource::Sidebar,
                },
            });
        }
        effects
    }
}
