//! Geographic and screen-space value types.
//!
//! [`GeoRectangle`] is the unit of area selection. It can only be built from
//! two arbitrary corners, which are normalized per axis, so `min <= max`
//! holds for every instance.

use serde::{Deserialize, Serialize};

/// Kilometres per degree of longitude used for the displayed area estimate.
pub const KM_PER_DEG_LON: f64 = 111.32;
/// Kilometres per degree of latitude used for the displayed area estimate.
pub const KM_PER_DEG_LAT: f64 = 110.574;

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Squared planar distance in (lat, lon) degree space.
    ///
    /// No great-circle correction; only meaningful over the small extents a
    /// selection covers.
    pub fn planar_distance_sq(&self, other: &GeoPoint) -> f64 {
        let d_lat = self.lat - other.lat;
        let d_lon = self.lon - other.lon;
        d_lat * d_lat + d_lon * d_lon
    }
}

/// A pixel position in the scene viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// An axis-aligned pixel rectangle, normalized so `min <= max` per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelRect {
    pub min: ScreenPoint,
    pub max: ScreenPoint,
}

impl PixelRect {
    /// Builds the rectangle spanned by two opposite corners given in any order.
    pub fn from_corners(a: ScreenPoint, b: ScreenPoint) -> Self {
        Self {
            min: ScreenPoint::new(a.x.min(b.x), a.y.min(b.y)),
            max: ScreenPoint::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: ScreenPoint) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// A latitude/longitude bounding box in degrees.
///
/// Serializes with the field names the analysis service expects
/// (`minLat`, `maxLat`, `minLon`, `maxLon`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoRectangle {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl GeoRectangle {
    /// Normalizes two arbitrary corner points into a rectangle.
    pub fn from_corners(a: GeoPoint, b: GeoPoint) -> Self {
        Self {
            min_lat: a.lat.min(b.lat),
            max_lat: a.lat.max(b.lat),
            min_lon: a.lon.min(b.lon),
            max_lon: a.lon.max(b.lon),
        }
    }

    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }

    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    pub fn centroid(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: GeoPoint) -> bool {
        p.lat >= self.min_lat && p.lat <= self.max_lat && p.lon >= self.min_lon && p.lon <= self.max_lon
    }

    /// Approximate area in square kilometres using fixed km-per-degree factors.
    pub fn area_km2(&self) -> f64 {
        let width = (self.max_lon - self.min_lon) * KM_PER_DEG_LON;
        let height = (self.max_lat - self.min_lat) * KM_PER_DEG_LAT;
        width * height
    }

    /// Text suitable for copying: `"minLat, minLon to maxLat, maxLon"`.
    pub fn clipboard_text(&self) -> String {
        format!(
            "{:.6}, {:.6} to {:.6}, {:.6}",
            self.min_lat, self.min_lon, self.max_lat, self.max_lon
        )
    }
}

// Deserialization goes through the corner constructor so unordered bounds
// from the wire are normalized like everything else.
impl<'de> Deserialize<'de> for GeoRectangle {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Raw {
            min_lat: f64,
            max_lat: f64,
            min_lon: f64,
            max_lon: f64,
        }

        let raw = Raw::deserialize(deserializer)?;
        Ok(GeoRectangle::from_corners(
            GeoPoint::new(raw.min_lat, raw.min_lon),
            GeoPoint::new(raw.max_lat, raw.max_lon),
        ))
    }
}

impl<'de> Deserialize<'de> for PixelRect {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            min: ScreenPoint,
            max: ScreenPoint,
        }

        let raw = Raw::deserialize(deserializer)?;
        Ok(PixelRect::from_corners(raw.min, raw.max))
    }
}
