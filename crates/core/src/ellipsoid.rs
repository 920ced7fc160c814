//! WGS84 reference ellipsoid math.
//!
//! World positions are Earth-centred, Earth-fixed (ECEF) metres, which is
//! what the scene engine hands back from its picking primitives.

use crate::geo::GeoPoint;
use crate::scene::Ray;
use glam::DVec3;

/// An oblate reference ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis in metres.
    pub equatorial_radius: f64,
    /// Semi-minor axis in metres.
    pub polar_radius: f64,
}

/// Local east/north/up unit vectors at a surface point.
#[derive(Debug, Clone, Copy)]
pub struct EnuFrame {
    pub east: DVec3,
    pub north: DVec3,
    pub up: DVec3,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        equatorial_radius: 6_378_137.0,
        polar_radius: 6_356_752.314_245_179,
    };

    fn radii(&self) -> DVec3 {
        DVec3::new(self.equatorial_radius, self.equatorial_radius, self.polar_radius)
    }

    /// First eccentricity squared.
    pub fn eccentricity_sq(&self) -> f64 {
        let a2 = self.equatorial_radius * self.equatorial_radius;
        let b2 = self.polar_radius * self.polar_radius;
        (a2 - b2) / a2
    }

    fn prime_vertical_radius(&self, sin_lat: f64) -> f64 {
        self.equatorial_radius / (1.0 - self.eccentricity_sq() * sin_lat * sin_lat).sqrt()
    }

    /// Converts a geodetic position (degrees, metres above the ellipsoid) to ECEF.
    pub fn to_cartesian(&self, point: GeoPoint, height: f64) -> DVec3 {
        let lat = point.lat.to_radians();
        let lon = point.lon.to_radians();
        let (sin_lat, cos_lat) = lat.sin_cos();
        let (sin_lon, cos_lon) = lon.sin_cos();
        let n = self.prime_vertical_radius(sin_lat);

        DVec3::new(
            (n + height) * cos_lat * cos_lon,
            (n + height) * cos_lat * sin_lon,
            (n * (1.0 - self.eccentricity_sq()) + height) * sin_lat,
        )
    }

    /// Converts an ECEF position to geodetic latitude/longitude and height.
    ///
    /// Returns `None` for the centre of the ellipsoid, where latitude is undefined.
    pub fn to_geodetic(&self, position: DVec3) -> Option<(GeoPoint, f64)> {
        if !position.is_finite() || position.length_squared() < 1.0 {
            return None;
        }

        let e2 = self.eccentricity_sq();
        let lon = position.y.atan2(position.x);
        let p = (position.x * position.x + position.y * position.y).sqrt();

        if p < 1e-9 {
            let lat = if position.z >= 0.0 { 90.0 } else { -90.0 };
            let height = position.z.abs() - self.polar_radius;
            return Some((GeoPoint::new(lat, lon.to_degrees()), height));
        }

        let mut lat = position.z.atan2(p * (1.0 - e2));
        let mut height = 0.0;
        for _ in 0..8 {
            let n = self.prime_vertical_radius(lat.sin());
            height = p / lat.cos() - n;
            lat = position.z.atan2(p * (1.0 - e2 * n / (n + height)));
        }

        Some((GeoPoint::new(lat.to_degrees(), lon.to_degrees()), height))
    }

    /// Nearest non-negative intersection of a ray with the ellipsoid surface.
    ///
    /// Returns `None` when the ray misses (e.g. points at open sky) or the
    /// surface lies entirely behind the ray origin.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<DVec3> {
        let inv = self.radii().recip();
        let o = ray.origin * inv;
        let d = ray.direction * inv;

        let a = d.dot(d);
        if a <= f64::EPSILON {
            return None;
        }
        let b = 2.0 * o.dot(d);
        let c = o.dot(o) - 1.0;

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }

        let root = discriminant.sqrt();
        let near = (-b - root) / (2.0 * a);
        let far = (-b + root) / (2.0 * a);

        let t = if near >= 0.0 {
            near
        } else if far >= 0.0 {
            far
        } else {
            return None;
        };

        Some(ray.origin + ray.direction * t)
    }

    /// East/north/up frame at a geodetic point.
    pub fn enu_frame(&self, point: GeoPoint) -> EnuFrame {
        let lat = point.lat.to_radians();
        let lon = point.lon.to_radians();
        let (sin_lat, cos_lat) = lat.sin_cos();
        let (sin_lon, cos_lon) = lon.sin_cos();

        EnuFrame {
            east: DVec3::new(-sin_lon, cos_lon, 0.0),
            north: DVec3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat),
            up: DVec3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WGS84: Ellipsoid = Ellipsoid::WGS84;

    #[test]
    fn test_geodetic_round_trip_bengaluru() {
        let point = GeoPoint::new(12.9716, 77.5946);
        let ecef = WGS84.to_cartesian(point, 920.0);
        let (back, height) = WGS84.to_geodetic(ecef).unwrap();

        assert!((back.lat - point.lat).abs() < 1e-9);
        assert!((back.lon - point.lon).abs() < 1e-9);
        assert!((height - 920.0).abs() < 1e-4);
    }

    #[test]
    fn test_equator_prime_meridian() {
        let ecef = WGS84.to_cartesian(GeoPoint::new(0.0, 0.0), 0.0);
        assert!((ecef.x - WGS84.equatorial_radius).abs() < 1e-6);
        assert!(ecef.y.abs() < 1e-6);
        assert!(ecef.z.abs() < 1e-6);
    }

    #[test]
    fn test_pole_is_handled() {
        let (point, height) = WGS84.to_geodetic(DVec3::new(0.0, 0.0, WGS84.polar_radius + 10.0)).unwrap();
        assert_eq!(point.lat, 90.0);
        assert!((height - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_ray_straight_down_hits_surface_below() {
        let target = GeoPoint::new(12.9716, 77.5946);
        let origin = WGS84.to_cartesian(target, 5_000.0);
        let direction = -WGS84.enu_frame(target).up;

        let hit = WGS84.intersect_ray(&Ray { origin, direction }).unwrap();
        let (point, height) = WGS84.to_geodetic(hit).unwrap();

        assert!((point.lat - target.lat).abs() < 1e-6);
        assert!((point.lon - target.lon).abs() < 1e-6);
        assert!(height.abs() < 1e-3);
    }

    #[test]
    fn test_ray_pointing_at_sky_misses() {
        let target = GeoPoint::new(12.9716, 77.5946);
        let origin = WGS84.to_cartesian(target, 5_000.0);
        let direction = WGS84.enu_frame(target).up;

        assert!(WGS84.intersect_ray(&Ray { origin, direction }).is_none());
    }

    #[test]
    fn test_ray_from_inside_hits_far_side() {
        let ray = Ray { origin: DVec3::ZERO, direction: DVec3::X };
        let hit = WGS84.intersect_ray(&ray).unwrap();
        assert!((hit.x - WGS84.equatorial_radius).abs() < 1e-6);
    }
}
