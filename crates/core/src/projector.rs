//! Screen-to-world projection.
//!
//! Depth-aware picking follows terrain relief and rendered geometry but fails
//! over open sky, near the horizon, or when the depth buffer is unavailable.
//! Ray/ellipsoid intersection is defined for any pixel that looks at the
//! globe but ignores relief, so it is only used when the depth pick misses.

use crate::geo::{GeoPoint, ScreenPoint};
use crate::scene::SceneEngine;
use glam::DVec3;

/// Geographic position of the visible surface under `pixel`.
///
/// Returns `None` only when both the depth pick and the ellipsoid fallback
/// miss, i.e. the pixel does not look at the globe at all.
pub fn project_surface<S: SceneEngine + ?Sized>(scene: &S, pixel: ScreenPoint) -> Option<GeoPoint> {
    let world = scene
        .pick_surface_position(pixel)
        .or_else(|| project_ellipsoid_world(scene, pixel))?;
    to_geo(scene, world)
}

/// Geographic position where the camera ray through `pixel` meets the terrain.
///
/// Used by click-to-restore, which does not care what object (if any) was
/// clicked.
pub fn project_terrain<S: SceneEngine + ?Sized>(scene: &S, pixel: ScreenPoint) -> Option<GeoPoint> {
    let ray = scene.camera_ray(pixel)?;
    let world = scene.project_ray_onto_terrain(&ray)?;
    to_geo(scene, world)
}

fn project_ellipsoid_world<S: SceneEngine + ?Sized>(scene: &S, pixel: ScreenPoint) -> Option<DVec3> {
    let ray = scene.camera_ray(pixel)?;
    scene.ellipsoid().intersect_ray(&ray)
}

fn to_geo<S: SceneEngine + ?Sized>(scene: &S, world: DVec3) -> Option<GeoPoint> {
    scene.ellipsoid().to_geodetic(world).map(|(point, _height)| point)
}
