//! A deterministic in-memory scene.
//!
//! The camera looks straight down from `altitude_m` above `center` through a
//! pinhole with vertical field of view `fov_y_deg`. Features are axis-aligned
//! pixel footprints; later entries are drawn on top of earlier ones. Depth
//! picks hit a terrain shell `terrain_height_m` above the ellipsoid, but only
//! inside `depth_coverage` when one is given, so the ellipsoid fallback can be
//! exercised.
//!
//! ```ignore
//! let scene = FixtureScene::load("scene.json")?;
//! let engine = SelectionEngine::new(scene, dispatcher, config)?;
//! ```

use super::{CameraChannels, CameraFlight, FeatureId, PickedObject, Ray, SceneEngine};
use crate::ellipsoid::Ellipsoid;
use crate::error::{AppError, Result};
use crate::geo::{GeoPoint, PixelRect, ScreenPoint};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

fn default_fov() -> f64 {
    60.0
}

fn default_visible() -> bool {
    true
}

/// Viewport size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Nadir-looking pinhole camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NadirCamera {
    pub center: GeoPoint,
    pub altitude_m: f64,
    pub viewport: Viewport,
    #[serde(default = "default_fov")]
    pub fov_y_deg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureFeature {
    pub id: FeatureId,
    pub footprint: PixelRect,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureScene {
    pub camera: NadirCamera,
    #[serde(default)]
    pub depth_coverage: Option<PixelRect>,
    #[serde(default)]
    pub terrain_height_m: f64,
    #[serde(default)]
    pub features: Vec<FixtureFeature>,
    /// Pickable non-feature objects, e.g. overlay primitives.
    #[serde(default)]
    pub overlays: Vec<PixelRect>,
    #[serde(skip)]
    pub camera_channels: CameraChannels,
    /// Every fly-to requested so far, oldest first.
    #[serde(skip)]
    pub flights: Vec<CameraFlight>,
    #[serde(skip)]
    pub pick_calls: std::cell::Cell<usize>,
}

impl FixtureScene {
    pub fn new(camera: NadirCamera) -> Self {
        Self {
            camera,
            depth_coverage: None,
            terrain_height_m: 0.0,
            features: Vec::new(),
            overlays: Vec::new(),
            camera_channels: CameraChannels::ALL,
            flights: Vec::new(),
            pick_calls: std::cell::Cell::new(0),
        }
    }

    /// Adds a visible feature with the given footprint.
    pub fn with_feature(mut self, id: u64, footprint: PixelRect) -> Self {
        self.features.push(FixtureFeature {
            id: FeatureId(id),
            footprint,
            visible: true,
        });
        self
    }

    pub fn with_depth_coverage(mut self, coverage: PixelRect) -> Self {
        self.depth_coverage = Some(coverage);
        self
    }

    /// Parses and validates a scene description.
    pub fn from_json(json: &str) -> Result<Self> {
        let scene: FixtureScene = serde_json::from_str(json)?;
        scene.validate()?;
        Ok(scene)
    }

    /// Loads a scene description from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Checks camera parameters and feature identity uniqueness.
    pub fn validate(&self) -> Result<()> {
        let cam = &self.camera;
        if !(cam.viewport.width > 0.0 && cam.viewport.height > 0.0) {
            return Err(AppError::scene("viewport must have a positive size"));
        }
        if !(cam.altitude_m > 0.0) {
            return Err(AppError::scene("camera altitude must be above the surface"));
        }
        if !(cam.fov_y_deg > 0.0 && cam.fov_y_deg < 180.0) {
            return Err(AppError::scene(format!("field of view {} out of range", cam.fov_y_deg)));
        }
        if !(cam.center.lat.abs() <= 90.0 && cam.center.lon.abs() <= 180.0) {
            return Err(AppError::scene("camera center is not a valid coordinate"));
        }

        let mut seen = HashSet::new();
        for feature in &self.features {
            if !seen.insert(feature.id) {
                return Err(AppError::scene(format!("duplicate feature id {}", feature.id)));
            }
        }
        Ok(())
    }

    /// Number of feature picks served so far.
    pub fn pick_count(&self) -> usize {
        self.pick_calls.get()
    }

    pub fn hidden_features(&self) -> Vec<FeatureId> {
        self.features.iter().filter(|f| !f.visible).map(|f| f.id).collect()
    }

    fn viewport_rect(&self) -> PixelRect {
        PixelRect::from_corners(
            ScreenPoint::new(0.0, 0.0),
            ScreenPoint::new(self.camera.viewport.width, self.camera.viewport.height),
        )
    }

    fn camera_position(&self) -> DVec3 {
        self.ellipsoid().to_cartesian(self.camera.center, self.camera.altitude_m)
    }

    fn terrain_shell(&self) -> Ellipsoid {
        let base = self.ellipsoid();
        Ellipsoid {
            equatorial_radius: base.equatorial_radius + self.terrain_height_m,
            polar_radius: base.polar_radius + self.terrain_height_m,
        }
    }
}

impl SceneEngine for FixtureScene {
    fn pick_feature(&self, pixel: ScreenPoint) -> Option<PickedObject> {
        self.pick_calls.set(self.pick_calls.get() + 1);

        if let Some(feature) = self.features.iter().rev().find(|f| f.footprint.contains(pixel)) {
            return Some(PickedObject::Feature(feature.id));
        }
        self.overlays
            .iter()
            .any(|rect| rect.contains(pixel))
            .then_some(PickedObject::Other)
    }

    fn pick_surface_position(&self, pixel: ScreenPoint) -> Option<DVec3> {
        if let Some(coverage) = self.depth_coverage {
            if !coverage.contains(pixel) {
                return None;
            }
        }
        let ray = self.camera_ray(pixel)?;
        self.terrain_shell().intersect_ray(&ray)
    }

    fn camera_ray(&self, pixel: ScreenPoint) -> Option<Ray> {
        if !self.viewport_rect().contains(pixel) {
            return None;
        }

        let cam = &self.camera;
        let frame = self.ellipsoid().enu_frame(cam.center);
        let focal = (cam.viewport.height / 2.0) / (cam.fov_y_deg.to_radians() / 2.0).tan();
        let dx = pixel.x - cam.viewport.width / 2.0;
        let dy = pixel.y - cam.viewport.height / 2.0;

        // Screen y grows downward, which is south for a north-up nadir view.
        let direction = (-frame.up * focal + frame.east * dx - frame.north * dy).normalize();
        Some(Ray {
            origin: self.camera_position(),
            direction,
        })
    }

    fn project_ray_onto_terrain(&self, ray: &Ray) -> Option<DVec3> {
        self.terrain_shell().intersect_ray(ray)
    }

    fn fly_camera_to(&mut self, flight: CameraFlight) {
        self.flights.push(flight);
    }

    fn set_camera_input_channels(&mut self, channels: CameraChannels) {
        self.camera_channels = channels;
    }

    fn is_feature_visible(&self, id: FeatureId) -> bool {
        self.features.iter().any(|f| f.id == id && f.visible)
    }

    fn set_feature_visible(&mut self, id: FeatureId, visible: bool) {
        if let Some(feature) = self.features.iter_mut().find(|f| f.id == id) {
            feature.visible = visible;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> NadirCamera {
        NadirCamera {
            center: GeoPoint::new(12.9716, 77.5946),
            altitude_m: 2_000.0,
            viewport: Viewport { width: 800.0, height: 600.0 },
            fov_y_deg: 60.0,
        }
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> PixelRect {
        PixelRect::from_corners(ScreenPoint::new(x0, y0), ScreenPoint::new(x1, y1))
    }

    #[test]
    fn test_center_pixel_looks_at_camera_center() {
        let scene = FixtureScene::new(camera());
        let hit = scene.pick_surface_position(ScreenPoint::new(400.0, 300.0)).unwrap();
        let (point, _) = scene.ellipsoid().to_geodetic(hit).unwrap();

        assert!((point.lat - 12.9716).abs() < 1e-6);
        assert!((point.lon - 77.5946).abs() < 1e-6);
    }

    #[test]
    fn test_screen_axes_map_to_east_and_south() {
        let scene = FixtureScene::new(camera());
        let ellipsoid = scene.ellipsoid();
        let right = scene.pick_surface_position(ScreenPoint::new(700.0, 300.0)).unwrap();
        let down = scene.pick_surface_position(ScreenPoint::new(400.0, 500.0)).unwrap();

        let (right, _) = ellipsoid.to_geodetic(right).unwrap();
        let (down, _) = ellipsoid.to_geodetic(down).unwrap();
        assert!(right.lon > 77.5946);
        assert!(down.lat < 12.9716);
    }

    #[test]
    fn test_depth_coverage_limits_surface_picks() {
        let scene = FixtureScene::new(camera()).with_depth_coverage(rect(0.0, 0.0, 100.0, 100.0));
        assert!(scene.pick_surface_position(ScreenPoint::new(50.0, 50.0)).is_some());
        assert!(scene.pick_surface_position(ScreenPoint::new(500.0, 50.0)).is_none());
        assert!(scene.camera_ray(ScreenPoint::new(500.0, 50.0)).is_some());
    }

    #[test]
    fn test_outside_viewport_has_no_ray() {
        let scene = FixtureScene::new(camera());
        assert!(scene.camera_ray(ScreenPoint::new(-1.0, 10.0)).is_none());
        assert!(scene.camera_ray(ScreenPoint::new(10.0, 601.0)).is_none());
    }

    #[test]
    fn test_topmost_feature_wins_and_hidden_features_still_pick() {
        let mut scene = FixtureScene::new(camera())
            .with_feature(1, rect(0.0, 0.0, 100.0, 100.0))
            .with_feature(2, rect(50.0, 50.0, 150.0, 150.0));

        assert_eq!(
            scene.pick_feature(ScreenPoint::new(75.0, 75.0)),
            Some(PickedObject::Feature(FeatureId(2)))
        );

        scene.set_feature_visible(FeatureId(2), false);
        assert!(!scene.is_feature_visible(FeatureId(2)));
        assert_eq!(
            scene.pick_feature(ScreenPoint::new(75.0, 75.0)),
            Some(PickedObject::Feature(FeatureId(2)))
        );
        assert_eq!(scene.hidden_features(), vec![FeatureId(2)]);
    }

    #[test]
    fn test_overlays_pick_as_other() {
        let mut scene = FixtureScene::new(camera());
        scene.overlays.push(rect(10.0, 10.0, 20.0, 20.0));
        assert_eq!(scene.pick_feature(ScreenPoint::new(15.0, 15.0)), Some(PickedObject::Other));
        assert_eq!(scene.pick_feature(ScreenPoint::new(35.0, 15.0)), None);
    }

    #[test]
    fn test_from_json_rejects_duplicate_ids() {
        let json = r#"{
            "camera": {"center": {"lat": 12.9, "lon": 77.5}, "altitude_m": 1000.0,
                       "viewport": {"width": 640.0, "height": 480.0}},
            "features": [
                {"id": 7, "footprint": {"min": {"x": 0, "y": 0}, "max": {"x": 10, "y": 10}}},
                {"id": 7, "footprint": {"min": {"x": 20, "y": 0}, "max": {"x": 30, "y": 10}}}
            ]
        }"#;
        let err = FixtureScene::from_json(json).unwrap_err();
        assert!(matches!(err, AppError::SceneInit(_)));
    }

    #[test]
    fn test_from_json_applies_defaults() {
        let json = r#"{
            "camera": {"center": {"lat": 12.9, "lon": 77.5}, "altitude_m": 1000.0,
                       "viewport": {"width": 640.0, "height": 480.0}},
            "features": [
                {"id": 1, "footprint": {"min": {"x": 0, "y": 0}, "max": {"x": 10, "y": 10}}}
            ]
        }"#;
        let scene = FixtureScene::from_json(json).unwrap();
        assert_eq!(scene.camera.fov_y_deg, 60.0);
        assert!(scene.features[0].visible);
        assert_eq!(scene.camera_channels, CameraChannels::ALL);
    }

    #[test]
    fn test_from_json_normalizes_swapped_footprint() {
        let json = r#"{
            "camera": {"center": {"lat": 12.9, "lon": 77.5}, "altitude_m": 1000.0,
                       "viewport": {"width": 640.0, "height": 480.0}},
            "features": [
                {"id": 3, "footprint": {"min": {"x": 100, "y": 100}, "max": {"x": 50, "y": 50}}}
            ]
        }"#;
        let scene = FixtureScene::from_json(json).unwrap();
        assert_eq!(
            scene.pick_feature(ScreenPoint::new(75.0, 75.0)),
            Some(PickedObject::Feature(FeatureId(3)))
        );
    }

    #[test]
    fn test_validate_rejects_bad_camera() {
        let mut cam = camera();
        cam.altitude_m = 0.0;
        assert!(FixtureScene::new(cam).validate().is_err());
    }
}
