//! Mode/operation state machine.
//!
//! [`SelectionEngine`] owns the scene, the deleted-feature registry and the
//! [`SessionState`], and routes every pointer event through one dispatcher:
//!
//! - no operation armed: pointer events draw a new selection rectangle
//!   (only in [`Mode::Interactive`], only while nothing is selected yet)
//! - operation armed with [`Method::Click`]: clicks hide the picked feature
//!   or restore the hidden feature nearest to the click
//! - operation armed with [`Method::Area`]: a drag over the selected area
//!   runs the [`AreaBatchPicker`]
//!
//! Camera input is locked to zoom while an operation is armed or a new
//! selection is being drawn. Viewing a committed selection keeps tilt and
//! look locked; with nothing selected every channel is enabled.

use crate::analysis::{AnalysisRequest, AnalysisSink};
use crate::config::Config;
use crate::error::Result;
use crate::geo::{GeoRectangle, ScreenPoint};
use crate::picker::{AreaBatchPicker, PickSummary};
use crate::projector::{project_surface, project_terrain};
use crate::registry::DeletedFeatureRegistry;
use crate::scene::{CameraChannels, FeatureId, PickedObject, SceneEngine};
use crate::selection::{DragSelector, SelectionEvent};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Camera navigation; no new selection can be drawn.
    #[default]
    View,
    /// Armed to draw a new bounding-box selection.
    Interactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Delete,
    Restore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Click,
    Area,
}

/// The armed `(operation, method)` pair. Both are set or neither is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedOperation {
    pub operation: Operation,
    pub method: Method,
}

/// Pointer input in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PointerEvent {
    Down(ScreenPoint),
    Move(ScreenPoint),
    Up(ScreenPoint),
    Click(ScreenPoint),
}

/// What a dispatched pointer event did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// The event does not apply in the current state.
    Ignored,
    SelectionStarted,
    PreviewUpdated(Option<GeoRectangle>),
    SelectionCommitted(GeoRectangle),
    /// Drag ended over open sky; no selection.
    SelectionAborted,
    FeatureHidden(FeatureId),
    FeatureRestored,
    /// A click operation found nothing to act on.
    Miss,
    AreaDragStarted,
    AreaApplied(PickSummary),
}

/// Per-session interaction state.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    mode: Mode,
    armed: Option<ArmedOperation>,
    active_selection: Option<GeoRectangle>,
    drag: DragSelector,
    area_drag_origin: Option<ScreenPoint>,
    generation: u64,
}

impl SessionState {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn armed(&self) -> Option<ArmedOperation> {
        self.armed
    }

    pub fn operation(&self) -> Option<Operation> {
        self.armed.map(|a| a.operation)
    }

    pub fn method(&self) -> Option<Method> {
        self.armed.map(|a| a.method)
    }

    pub fn active_selection(&self) -> Option<GeoRectangle> {
        self.active_selection
    }

    /// Origin of a new-selection drag in progress.
    pub fn drag_origin(&self) -> Option<ScreenPoint> {
        self.drag.origin()
    }

    /// Origin of an area-operation drag in progress.
    pub fn area_drag_origin(&self) -> Option<ScreenPoint> {
        self.area_drag_origin
    }

    /// Rectangle to draw while a new selection is being dragged.
    pub fn preview(&self) -> Option<GeoRectangle> {
        self.drag.preview()
    }

    /// Bumped every time a selection is committed or cleared.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn status_line(&self) -> &'static str {
        match (self.mode, self.active_selection.is_some()) {
            (Mode::Interactive, false) => "Draw area on map to analyze",
            (Mode::View, true) => "Area selected — Analysis ready",
            _ => "View mode — Navigate the map",
        }
    }

    fn camera_channels_for_view(&self) -> CameraChannels {
        if self.active_selection.is_some() {
            CameraChannels::SELECTION_VIEW
        } else {
            CameraChannels::ALL
        }
    }
}

/// Borrowed collaborators handed to the dispatcher alongside the state.
struct Context<'a, S: SceneEngine, A: AnalysisSink> {
    scene: &'a mut S,
    analysis: &'a mut A,
    registry: &'a mut DeletedFeatureRegistry,
    picker: AreaBatchPicker,
    config: &'a Config,
}

/// Top-level controller for selection and feature visibility.
pub struct SelectionEngine<S: SceneEngine, A: AnalysisSink> {
    scene: S,
    analysis: A,
    registry: DeletedFeatureRegistry,
    session: SessionState,
    picker: AreaBatchPicker,
    config: Config,
}

impl<S: SceneEngine, A: AnalysisSink> SelectionEngine<S, A> {
    /// Builds the engine over an initialized scene and enables every camera channel.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AppError::Config`] if the sampling step is invalid.
    pub fn new(mut scene: S, analysis: A, config: Config) -> Result<Self> {
        if !(config.sample_step_px.is_finite() && config.sample_step_px > 0.0) {
            return Err(crate::AppError::config(format!(
                "sample step must be positive, got {}",
                config.sample_step_px
            )));
        }

        scene.set_camera_input_channels(CameraChannels::ALL);
        Ok(Self {
            scene,
            analysis,
            registry: DeletedFeatureRegistry::new(),
            session: SessionState::default(),
            picker: AreaBatchPicker::new(config.sample_step_px),
            config,
        })
    }

    /// Routes one pointer event. Never fails; misses are reported in the [`Outcome`].
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Outcome {
        let mut cx = Context {
            scene: &mut self.scene,
            analysis: &mut self.analysis,
            registry: &mut self.registry,
            picker: self.picker,
            config: &self.config,
        };
        dispatch(&mut self.session, &mut cx, event)
    }

    /// Arms a new bounding-box selection, clearing any existing one first.
    pub fn enter_interactive(&mut self) {
        if self.session.active_selection.is_some() {
            self.clear_selection();
        }
        self.session.mode = Mode::Interactive;
        self.scene.set_camera_input_channels(CameraChannels::ZOOM_ONLY);
        debug!("entered interactive mode");
    }

    /// Back to navigation: disarms any operation and abandons drags in progress.
    pub fn enter_view(&mut self) {
        let session = &mut self.session;
        session.mode = Mode::View;
        session.armed = None;
        session.area_drag_origin = None;
        session.drag.cancel();
        self.scene.set_camera_input_channels(session.camera_channels_for_view());
        debug!(selected = session.active_selection.is_some(), "entered view mode");
    }

    /// Whether `operation` can be armed right now.
    ///
    /// Deleting needs a selected area; restoring needs something to restore.
    pub fn can_arm(&self, operation: Operation) -> bool {
        match operation {
            Operation::Delete => self.session.active_selection.is_some(),
            Operation::Restore => !self.registry.is_empty(),
        }
    }

    /// Arms `(operation, method)`. Returns `false` and changes nothing when unavailable.
    pub fn arm(&mut self, operation: Operation, method: Method) -> bool {
        if !self.can_arm(operation) {
            debug!(?operation, ?method, "operation unavailable");
            return false;
        }

        let session = &mut self.session;
        session.armed = Some(ArmedOperation { operation, method });
        session.area_drag_origin = None;
        if method == Method::Area {
            session.mode = Mode::View;
            session.drag.cancel();
        }
        self.scene.set_camera_input_channels(CameraChannels::ZOOM_ONLY);
        debug!(?operation, ?method, "operation armed");
        true
    }

    /// Drops the selection and everything tied to it. Hidden features stay hidden.
    pub fn clear_selection(&mut self) {
        let session = &mut self.session;
        session.active_selection = None;
        session.armed = None;
        session.area_drag_origin = None;
        session.drag.cancel();
        session.mode = Mode::View;
        session.generation += 1;

        self.analysis.discard(session.generation);
        self.scene.set_camera_input_channels(CameraChannels::ALL);
        info!(generation = session.generation, "selection cleared");
    }

    /// Shows every hidden feature again. Returns how many were restored.
    pub fn restore_all(&mut self) -> usize {
        self.registry.restore_all(&mut self.scene)
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn registry(&self) -> &DeletedFeatureRegistry {
        &self.registry
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn analysis(&self) -> &A {
        &self.analysis
    }

    pub fn analysis_mut(&mut self) -> &mut A {
        &mut self.analysis
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_parts(self) -> (S, A, DeletedFeatureRegistry) {
        (self.scene, self.analysis, self.registry)
    }
}

fn dispatch<S: SceneEngine, A: AnalysisSink>(
    state: &mut SessionState,
    cx: &mut Context<'_, S, A>,
    event: PointerEvent,
) -> Outcome {
    match event {
        PointerEvent::Down(pixel) => on_down(state, pixel),
        PointerEvent::Move(pixel) => on_move(state, cx, pixel),
        PointerEvent::Up(pixel) => on_up(state, cx, pixel),
        PointerEvent::Click(pixel) => on_click(state, cx, pixel),
    }
}

fn on_down(state: &mut SessionState, pixel: ScreenPoint) -> Outcome {
    if state.method() == Some(Method::Area) && state.active_selection.is_some() {
        state.area_drag_origin = Some(pixel);
        return Outcome::AreaDragStarted;
    }

    if state.mode == Mode::Interactive && state.active_selection.is_none() {
        return match state.drag.begin(pixel) {
            SelectionEvent::Started => Outcome::SelectionStarted,
            _ => Outcome::Ignored,
        };
    }

    Outcome::Ignored
}

fn on_move<S: SceneEngine, A: AnalysisSink>(
    state: &mut SessionState,
    cx: &mut Context<'_, S, A>,
    pixel: ScreenPoint,
) -> Outcome {
    if state.mode != Mode::Interactive {
        return Outcome::Ignored;
    }
    match state.drag.update(&*cx.scene, pixel) {
        SelectionEvent::Dragging(preview) => Outcome::PreviewUpdated(preview),
        _ => Outcome::Ignored,
    }
}

fn on_up<S: SceneEngine, A: AnalysisSink>(
    state: &mut SessionState,
    cx: &mut Context<'_, S, A>,
    pixel: ScreenPoint,
) -> Outcome {
    if let Some(origin) = state.area_drag_origin.take() {
        let Some(armed) = state.armed.filter(|a| a.method == Method::Area) else {
            return Outcome::Ignored;
        };
        if state.active_selection.is_none() {
            return Outcome::Ignored;
        }

        let summary = cx.picker.apply(cx.scene, cx.registry, origin, pixel, armed.operation);
        cx.scene.set_camera_input_channels(CameraChannels::ALL);
        info!(
            operation = ?armed.operation,
            affected = summary.affected,
            hidden = cx.registry.len(),
            "area operation applied"
        );
        return Outcome::AreaApplied(summary);
    }

    match state.drag.finish(&*cx.scene, pixel) {
        SelectionEvent::Completed(rect) => {
            commit_selection(state, cx, rect);
            Outcome::SelectionCommitted(rect)
        }
        SelectionEvent::Cancelled => Outcome::SelectionAborted,
        _ => Outcome::Ignored,
    }
}

fn on_click<S: SceneEngine, A: AnalysisSink>(
    state: &mut SessionState,
    cx: &mut Context<'_, S, A>,
    pixel: ScreenPoint,
) -> Outcome {
    let Some(ArmedOperation { operation, method: Method::Click }) = state.armed else {
        return Outcome::Ignored;
    };

    match operation {
        Operation::Delete => {
            let Some(PickedObject::Feature(feature)) = cx.scene.pick_feature(pixel) else {
                return Outcome::Miss;
            };
            let Some(position) = project_surface(&*cx.scene, pixel) else {
                return Outcome::Miss;
            };
            if cx.registry.hide(cx.scene, feature, position) {
                Outcome::FeatureHidden(feature)
            } else {
                Outcome::Ignored
            }
        }
        // The pick result is irrelevant here: the operator only needs to
        // click near a deleted feature, not on it.
        Operation::Restore => {
            let Some(point) = project_terrain(&*cx.scene, pixel) else {
                return Outcome::Miss;
            };
            if cx.registry.restore_nearest(cx.scene, point) {
                Outcome::FeatureRestored
            } else {
                Outcome::Miss
            }
        }
    }
}

fn commit_selection<S: SceneEngine, A: AnalysisSink>(
    state: &mut SessionState,
    cx: &mut Context<'_, S, A>,
    rect: GeoRectangle,
) {
    state.active_selection = Some(rect);
    state.mode = Mode::View;
    state.generation += 1;

    info!(
        generation = state.generation,
        min_lat = rect.min_lat(),
        max_lat = rect.max_lat(),
        min_lon = rect.min_lon(),
        max_lon = rect.max_lon(),
        area_km2 = rect.area_km2(),
        "selection committed"
    );

    cx.analysis.submit(
        state.generation,
        AnalysisRequest::new(rect, cx.config.scenario_text.clone()),
    );
    cx.scene.fly_camera_to(cx.config.flight.flight_to(rect.centroid()));
    cx.scene.set_camera_input_channels(state.camera_channels_for_view());
}
