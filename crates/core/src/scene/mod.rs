//! The scene engine collaborator.
//!
//! Rendering, tile streaming and camera animation belong to an external 3D
//! engine. The selection core only talks to it through [`SceneEngine`]:
//! picking primitives, camera fly-to, camera input locking and each
//! feature's own visibility flag.

pub mod fixture;

pub use fixture::FixtureScene;

use crate::ellipsoid::Ellipsoid;
use crate::geo::{GeoPoint, ScreenPoint};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a toggleable scene feature (e.g. a building).
///
/// Identity is stable for the lifetime of the engine session that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(pub u64);

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a feature pick found under a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickedObject {
    /// A trackable, visibility-toggleable feature.
    Feature(FeatureId),
    /// Some other rendered object (overlay, primitive) that cannot be hidden.
    Other,
}

impl PickedObject {
    pub fn feature(self) -> Option<FeatureId> {
        match self {
            PickedObject::Feature(id) => Some(id),
            PickedObject::Other => None,
        }
    }
}

/// A ray in ECEF metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: DVec3,
    pub direction: DVec3,
}

/// Camera input channels the operator can use to move the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraChannels {
    pub rotate: bool,
    pub translate: bool,
    pub zoom: bool,
    pub tilt: bool,
    pub look: bool,
}

impl CameraChannels {
    /// Every channel enabled.
    pub const ALL: CameraChannels = CameraChannels {
        rotate: true,
        translate: true,
        zoom: true,
        tilt: true,
        look: true,
    };

    /// Only zoom: the operator can change altitude but not pan away.
    pub const ZOOM_ONLY: CameraChannels = CameraChannels {
        rotate: false,
        translate: false,
        zoom: true,
        tilt: false,
        look: false,
    };

    /// Viewing a committed selection: tilt and look stay locked so the
    /// rectangle overlay remains legible.
    pub const SELECTION_VIEW: CameraChannels = CameraChannels {
        rotate: true,
        translate: true,
        zoom: true,
        tilt: false,
        look: false,
    };
}

impl Default for CameraChannels {
    fn default() -> Self {
        Self::ALL
    }
}

/// Heading/pitch/roll in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraOrientation {
    pub heading_deg: f64,
    pub pitch_deg: f64,
    pub roll_deg: f64,
}

/// A camera fly-to request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraFlight {
    pub target: GeoPoint,
    pub altitude_m: f64,
    pub orientation: CameraOrientation,
    pub duration_secs: f64,
}

/// Primitives the selection core consumes from the 3D scene engine.
///
/// All calls happen on the single input-handling thread.
pub trait SceneEngine {
    /// Object under `pixel`, if any.
    ///
    /// Features are reported whether or not they are currently shown, so
    /// hidden features can be found again for restoring.
    fn pick_feature(&self, pixel: ScreenPoint) -> Option<PickedObject>;

    /// Depth-aware world position of the visible surface (terrain or any
    /// rendered geometry) under `pixel`.
    ///
    /// Unreliable at oblique angles and over the horizon; `None` when the
    /// depth buffer has nothing there.
    fn pick_surface_position(&self, pixel: ScreenPoint) -> Option<DVec3>;

    /// Ray from the camera through `pixel`, or `None` outside the viewport.
    fn camera_ray(&self, pixel: ScreenPoint) -> Option<Ray>;

    /// Intersection of `ray` with the loaded terrain.
    fn project_ray_onto_terrain(&self, ray: &Ray) -> Option<DVec3>;

    /// Animates the camera to `flight`.
    fn fly_camera_to(&mut self, flight: CameraFlight);

    /// Enables/disables camera input channels.
    fn set_camera_input_channels(&mut self, channels: CameraChannels);

    fn is_feature_visible(&self, id: FeatureId) -> bool;

    fn set_feature_visible(&mut self, id: FeatureId, visible: bool);

    /// Reference ellipsoid used for the fallback projection.
    fn ellipsoid(&self) -> Ellipsoid {
        Ellipsoid::WGS84
    }
}
