//! Drag-based bounding-box selection.
//!
//! Turns a pointer-down/move/up sequence into a [`GeoRectangle`]. Each move
//! recomputes the preview from scratch by projecting the drag box's min/max
//! pixel corners; pointer-up projects once more and either commits or, when a
//! corner lands on open sky, aborts the gesture.

use crate::geo::{GeoRectangle, PixelRect, ScreenPoint};
use crate::projector::project_surface;
use crate::scene::SceneEngine;
use tracing::debug;

/// Result of feeding one pointer event to the [`DragSelector`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionEvent {
    /// User started a new selection drag.
    Started,
    /// User is actively dragging; carries the current preview, if any
    /// corner pair has projected so far.
    Dragging(Option<GeoRectangle>),
    /// User released over the globe; the rectangle is ready to commit.
    Completed(GeoRectangle),
    /// User released with a corner off the globe; nothing is produced.
    Cancelled,
    /// The event does not apply to the current drag state.
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum DragState {
    #[default]
    Idle,
    Dragging {
        origin: ScreenPoint,
        preview: Option<GeoRectangle>,
    },
}

/// `Idle -> Dragging -> Idle` selector for new selection rectangles.
#[derive(Debug, Clone, Default)]
pub struct DragSelector {
    state: DragState,
}

/// Projects the min/max pixel corners of the box spanned by `a` and `b`.
///
/// Returns `None` if either corner misses the globe.
pub fn project_drag_box<S: SceneEngine + ?Sized>(
    scene: &S,
    a: ScreenPoint,
    b: ScreenPoint,
) -> Option<GeoRectangle> {
    let pixels = PixelRect::from_corners(a, b);
    let top_left = project_surface(scene, pixels.min)?;
    let bottom_right = project_surface(scene, pixels.max)?;
    Some(GeoRectangle::from_corners(top_left, bottom_right))
}

impl DragSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a drag at `origin`. Ignored while a drag is already running.
    pub fn begin(&mut self, origin: ScreenPoint) -> SelectionEvent {
        if self.is_dragging() {
            return SelectionEvent::None;
        }
        self.state = DragState::Dragging { origin, preview: None };
        debug!(x = origin.x, y = origin.y, "selection drag started");
        SelectionEvent::Started
    }

    /// Recomputes the preview for the pointer at `current`.
    ///
    /// A move whose corners do not project keeps the previous preview.
    pub fn update<S: SceneEngine + ?Sized>(&mut self, scene: &S, current: ScreenPoint) -> SelectionEvent {
        let DragState::Dragging { origin, preview } = &mut self.state else {
            return SelectionEvent::None;
        };

        if let Some(rect) = project_drag_box(scene, *origin, current) {
            *preview = Some(rect);
        }
        SelectionEvent::Dragging(*preview)
    }

    /// Ends the drag at `end`, returning the selector to idle either way.
    pub fn finish<S: SceneEngine + ?Sized>(&mut self, scene: &S, end: ScreenPoint) -> SelectionEvent {
        let DragState::Dragging { origin, .. } = std::mem::take(&mut self.state) else {
            return SelectionEvent::None;
        };

        match project_drag_box(scene, origin, end) {
            Some(rect) => SelectionEvent::Completed(rect),
            None => {
                debug!("selection drag ended off the globe, discarding");
                SelectionEvent::Cancelled
            }
        }
    }

    /// Drops any running drag and its preview.
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Pixel where the running drag started.
    pub fn origin(&self) -> Option<ScreenPoint> {
        match self.state {
            DragState::Dragging { origin, .. } => Some(origin),
            DragState::Idle => None,
        }
    }

    /// Rectangle to draw while dragging.
    pub fn preview(&self) -> Option<GeoRectangle> {
        match self.state {
            DragState::Dragging { preview, .. } => preview,
            DragState::Idle => None,
        }
    }
}
