//! Grid-sampling area batch picker.
//!
//! Samples a regular pixel grid over a dragged rectangle and applies the
//! armed operation to every feature hit. Each feature is processed at most
//! once per gesture.
//!
//! This is a coarse approximation: a feature smaller than the sampling step,
//! or whose silhouette covers no sample point, is silently skipped. Cost is
//! one feature pick per sample, `O((width / step) * (height / step))`, run
//! synchronously on the input thread.

use crate::geo::{PixelRect, ScreenPoint};
use crate::projector::project_surface;
use crate::registry::DeletedFeatureRegistry;
use crate::scene::{FeatureId, SceneEngine};
use crate::session::Operation;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Sampling step in pixels for selection-area operations.
pub const DEFAULT_SAMPLE_STEP: f64 = 20.0;

/// Upper bound on grid points along one axis of a single gesture.
pub const MAX_AXIS_SAMPLES: usize = 4096;

fn axis_samples(extent: f64, step: f64) -> usize {
    ((extent / step).floor() as usize).saturating_add(1).min(MAX_AXIS_SAMPLES)
}

/// What one area gesture did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PickSummary {
    /// Sample pixels picked.
    pub samples: usize,
    /// Features hidden (DELETE) or restored (RESTORE).
    pub affected: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct AreaBatchPicker {
    step: f64,
}

impl Default for AreaBatchPicker {
    fn default() -> Self {
        Self { step: DEFAULT_SAMPLE_STEP }
    }
}

impl AreaBatchPicker {
    /// Creates a picker; non-positive or non-finite steps fall back to the default.
    pub fn new(step: f64) -> Self {
        if step.is_finite() && step > 0.0 {
            Self { step }
        } else {
            Self::default()
        }
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Grid points from the rectangle's min corner in `step` increments,
    /// inclusive of the max edge when it falls on the grid.
    ///
    /// Each axis is capped at [`MAX_AXIS_SAMPLES`]; a rectangle with a
    /// non-finite corner yields no points.
    pub fn sample_points(&self, rect: PixelRect) -> impl Iterator<Item = ScreenPoint> + use<> {
        let step = self.step;
        let (columns, rows) = if rect.min.is_finite() && rect.max.is_finite() {
            (axis_samples(rect.width(), step), axis_samples(rect.height(), step))
        } else {
            (0, 0)
        };
        let origin = rect.min;

        (0..columns).flat_map(move |i| {
            (0..rows).map(move |j| ScreenPoint::new(origin.x + i as f64 * step, origin.y + j as f64 * step))
        })
    }

    /// Applies `operation` to every feature sampled inside the box spanned by `a` and `b`.
    pub fn apply<S: SceneEngine + ?Sized>(
        &self,
        scene: &mut S,
        registry: &mut DeletedFeatureRegistry,
        a: ScreenPoint,
        b: ScreenPoint,
        operation: Operation,
    ) -> PickSummary {
        let rect = PixelRect::from_corners(a, b);
        if !(rect.min.is_finite() && rect.max.is_finite()) {
            warn!(?a, ?b, "area gesture with non-finite corners ignored");
            return PickSummary::default();
        }
        let mut visited: HashSet<FeatureId> = HashSet::new();
        let mut summary = PickSummary::default();

        for pixel in self.sample_points(rect) {
            summary.samples += 1;

            let Some(feature) = scene.pick_feature(pixel).and_then(|picked| picked.feature()) else {
                continue;
            };
            if visited.contains(&feature) {
                continue;
            }

            let changed = match operation {
                Operation::Delete => {
                    if !scene.is_feature_visible(feature) {
                        visited.insert(feature);
                        continue;
                    }
                    // Another sample on the same feature may still project.
                    let Some(position) = project_surface(&*scene, pixel) else {
                        continue;
                    };
                    visited.insert(feature);
                    registry.hide(scene, feature, position)
                }
                Operation::Restore => {
                    visited.insert(feature);
                    !scene.is_feature_visible(feature) && registry.restore_exact(scene, feature)
                }
            };

            if changed {
                summary.affected += 1;
            }
        }

        debug!(
            ?operation,
            samples = summary.samples,
            distinct = visited.len(),
            affected = summary.affected,
            "area batch pick finished"
        );
        summary
    }
}
