//! Deleted-feature registry.
//!
//! The authoritative set of features the operator has hidden, each with the
//! geographic position it was picked at. A feature id appears at most once.
//! Records are kept in insertion order, which is also the tie-break order of
//! [`DeletedFeatureRegistry::restore_nearest`].

use crate::geo::GeoPoint;
use crate::scene::{FeatureId, SceneEngine};
use tracing::{debug, info};

/// A hidden feature and where it was picked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeletedFeatureRecord {
    feature: FeatureId,
    position: GeoPoint,
}

impl DeletedFeatureRecord {
    pub fn feature(&self) -> FeatureId {
        self.feature
    }

    /// Position captured at delete time; never recomputed.
    pub fn position(&self) -> GeoPoint {
        self.position
    }
}

#[derive(Debug, Default)]
pub struct DeletedFeatureRegistry {
    records: Vec<DeletedFeatureRecord>,
}

impl DeletedFeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hides `feature` in the scene and records it.
    ///
    /// Returns `false` without touching the scene if the feature is already
    /// recorded.
    pub fn hide<S: SceneEngine + ?Sized>(&mut self, scene: &mut S, feature: FeatureId, position: GeoPoint) -> bool {
        if self.contains(feature) {
            debug!(%feature, "feature already hidden");
            return false;
        }

        scene.set_feature_visible(feature, false);
        self.records.push(DeletedFeatureRecord { feature, position });
        debug!(%feature, lat = position.lat, lon = position.lon, hidden = self.records.len(), "feature hidden");
        true
    }

    /// Restores the record closest to `point` by squared lat/lon distance.
    ///
    /// Returns `false` on an empty registry. Exact ties go to the earliest record.
    pub fn restore_nearest<S: SceneEngine + ?Sized>(&mut self, scene: &mut S, point: GeoPoint) -> bool {
        let nearest = self
            .records
            .iter()
            .enumerate()
            .fold(None::<(usize, f64)>, |best, (index, record)| {
                let dist = record.position.planar_distance_sq(&point);
                match best {
                    Some((_, best_dist)) if best_dist <= dist => best,
                    _ => Some((index, dist)),
                }
            });

        let Some((index, dist)) = nearest else {
            return false;
        };

        let record = self.records.remove(index);
        scene.set_feature_visible(record.feature, true);
        info!(feature = %record.feature, distance_sq = dist, "restored nearest hidden feature");
        true
    }

    /// Restores one specific feature, if it is recorded.
    pub fn restore_exact<S: SceneEngine + ?Sized>(&mut self, scene: &mut S, feature: FeatureId) -> bool {
        let Some(index) = self.records.iter().position(|r| r.feature == feature) else {
            return false;
        };

        self.records.remove(index);
        scene.set_feature_visible(feature, true);
        debug!(%feature, hidden = self.records.len(), "feature restored");
        true
    }

    /// Shows every recorded feature again and empties the registry.
    ///
    /// Returns how many features were restored.
    pub fn restore_all<S: SceneEngine + ?Sized>(&mut self, scene: &mut S) -> usize {
        let restored = self.records.len();
        for record in self.records.drain(..) {
            scene.set_feature_visible(record.feature, true);
        }
        if restored > 0 {
            info!(restored, "restored all hidden features");
        }
        restored
    }

    pub fn contains(&self, feature: FeatureId) -> bool {
        self.records.iter().any(|r| r.feature == feature)
    }

    /// Number of hidden, tracked features.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[DeletedFeatureRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{PixelRect, ScreenPoint};
    use crate::scene::fixture::{NadirCamera, Viewport};
    use crate::scene::FixtureScene;

    fn scene_with(ids: &[u64]) -> FixtureScene {
        let camera = NadirCamera {
            center: GeoPoint::new(12.9, 77.5),
            altitude_m: 1_000.0,
            viewport: Viewport { width: 400.0, height: 400.0 },
            fov_y_deg: 60.0,
        };
        ids.iter().fold(FixtureScene::new(camera), |scene, &id| {
            let x = id as f64 * 10.0;
            scene.with_feature(
                id,
                PixelRect::from_corners(ScreenPoint::new(x, 0.0), ScreenPoint::new(x + 5.0, 5.0)),
            )
        })
    }

    #[test]
    fn test_hide_is_idempotent() {
        let mut scene = scene_with(&[1]);
        let mut registry = DeletedFeatureRegistry::new();

        assert!(registry.hide(&mut scene, FeatureId(1), GeoPoint::new(12.9, 77.5)));
        assert!(!registry.hide(&mut scene, FeatureId(1), GeoPoint::new(13.0, 78.0)));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.records()[0].position(), GeoPoint::new(12.9, 77.5));
        assert!(!scene.is_feature_visible(FeatureId(1)));
    }

    #[test]
    fn test_hide_then_restore_exact_round_trip() {
        let mut scene = scene_with(&[1, 2]);
        let mut registry = DeletedFeatureRegistry::new();
        registry.hide(&mut scene, FeatureId(2), GeoPoint::new(0.0, 0.0));
        let before = registry.len();

        registry.hide(&mut scene, FeatureId(1), GeoPoint::new(1.0, 1.0));
        assert!(registry.restore_exact(&mut scene, FeatureId(1)));

        assert_eq!(registry.len(), before);
        assert!(scene.is_feature_visible(FeatureId(1)));
        assert!(!scene.is_feature_visible(FeatureId(2)));
    }

    #[test]
    fn test_restore_exact_unknown_feature() {
        let mut scene = scene_with(&[1]);
        let mut registry = DeletedFeatureRegistry::new();
        assert!(!registry.restore_exact(&mut scene, FeatureId(1)));
        assert!(scene.is_feature_visible(FeatureId(1)));
    }

    #[test]
    fn test_restore_nearest_on_empty_registry() {
        let mut scene = scene_with(&[1]);
        let mut registry = DeletedFeatureRegistry::new();
        assert!(!registry.restore_nearest(&mut scene, GeoPoint::new(0.0, 0.0)));
        assert!(registry.is_empty());
        assert!(scene.hidden_features().is_empty());
    }

    #[test]
    fn test_restore_nearest_picks_minimum_squared_distance() {
        let mut scene = scene_with(&[1, 2]);
        let mut registry = DeletedFeatureRegistry::new();
        let p = GeoPoint::new(10.0, 10.0);

        // Squared distances 4.0 and 1.0 from p.
        registry.hide(&mut scene, FeatureId(1), GeoPoint::new(12.0, 10.0));
        registry.hide(&mut scene, FeatureId(2), GeoPoint::new(10.0, 11.0));

        assert!(registry.restore_nearest(&mut scene, p));
        assert!(scene.is_feature_visible(FeatureId(2)));
        assert!(!scene.is_feature_visible(FeatureId(1)));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(FeatureId(1)));
    }

    #[test]
    fn test_restore_all() {
        let mut scene = scene_with(&[1, 2, 3]);
        let mut registry = DeletedFeatureRegistry::new();
        for id in 1..=3 {
            registry.hide(&mut scene, FeatureId(id), GeoPoint::new(id as f64, 0.0));
        }

        assert_eq!(registry.restore_all(&mut scene), 3);
        assert!(registry.is_empty());
        assert!(scene.hidden_features().is_empty());
        assert_eq!(registry.restore_all(&mut scene), 0);
    }
}
