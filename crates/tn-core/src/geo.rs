//! Geographic coordinate type and spatial helpers.
//!
//! `GeoPoint3` uses `f64` (double-precision) longitude/latitude/elevation.
//! The pipeline's smallest tolerance is the 0.01 m split-point merge radius —
//! roughly 1e-7 degrees — which sits far below `f32` resolution at continental
//! longitudes, so everything here is f64.
//!
//! Coordinates are WGS-84 (EPSG:4326), stored `(lng, lat)` to match the
//! `(x, y)` axis order of planar geometry code.

use std::fmt;

/// Mean Earth radius in metres, shared by every haversine computation in the
/// workspace.  All "length in metres" figures must come through this module
/// so cached scalars and invariant checks agree bit-for-bit.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Metres per degree of latitude (and of longitude at the equator).
pub const M_PER_DEG: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

/// A WGS-84 geographic coordinate with elevation in metres.
#[derive(Copy, Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct GeoPoint3 {
    pub lng:  f64,
    pub lat:  f64,
    pub elev: f64,
}

impl GeoPoint3 {
    #[inline]
    pub fn new(lng: f64, lat: f64, elev: f64) -> Self {
        Self { lng, lat, elev }
    }

    /// Haversine great-circle distance in metres, ignoring elevation.
    pub fn distance_m(self, other: GeoPoint3) -> f64 {
        haversine_m(self.lng, self.lat, other.lng, other.lat)
    }

    /// `true` when every component is a finite number.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.lng.is_finite() && self.lat.is_finite() && self.elev.is_finite()
    }

    /// Copy with lng/lat decimal-rounded to `decimals` places.  Elevation is
    /// never rounded; it does not participate in vertex identity.
    #[inline]
    pub fn rounded(self, decimals: u32) -> GeoPoint3 {
        GeoPoint3 {
            lng:  round_decimals(self.lng, decimals),
            lat:  round_decimals(self.lat, decimals),
            elev: self.elev,
        }
    }

    /// Integer quantisation key for hash/sort identity at `decimals` places.
    ///
    /// Two points with equal keys are "the same location" everywhere the
    /// pipeline compares coordinates (vertex extraction, endpoint matching).
    #[inline]
    pub fn key(self, decimals: u32) -> (i64, i64) {
        (quantize(self.lng, decimals), quantize(self.lat, decimals))
    }
}

impl fmt::Display for GeoPoint3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6}, {:.1})", self.lng, self.lat, self.elev)
    }
}

// ── Scalar helpers ────────────────────────────────────────────────────────────

/// Haversine distance between two lng/lat pairs, in metres.
pub fn haversine_m(lng1: f64, lat1: f64, lng2: f64, lat2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat * 0.5).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng * 0.5).sin().powi(2);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Round `v` to `decimals` decimal places.
#[inline]
pub fn round_decimals(v: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (v * scale).round() / scale
}

/// Quantise `v` to an integer at `decimals` decimal places.
#[inline]
pub fn quantize(v: f64, decimals: u32) -> i64 {
    let scale = 10f64.powi(decimals as i32);
    (v * scale).round() as i64
}

/// Metres spanned by one degree of longitude and one degree of latitude at
/// latitude `lat_deg`.  Used for local equirectangular projections where
/// planar math needs to be metre-true (closest-point, point-to-line
/// distance).
#[inline]
pub fn meters_per_degree(lat_deg: f64) -> (f64, f64) {
    (M_PER_DEG * lat_deg.to_radians().cos(), M_PER_DEG)
}

// ── Bounding box ──────────────────────────────────────────────────────────────

/// Axis-aligned lng/lat envelope.
#[derive(Copy, Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct BBox {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

impl BBox {
    /// An inverted envelope that expands to the first point added.
    pub const EMPTY: BBox = BBox {
        min_lng: f64::INFINITY,
        min_lat: f64::INFINITY,
        max_lng: f64::NEG_INFINITY,
        max_lat: f64::NEG_INFINITY,
    };

    #[inline]
    pub fn expand(&mut self, p: GeoPoint3) {
        self.min_lng = self.min_lng.min(p.lng);
        self.min_lat = self.min_lat.min(p.lat);
        self.max_lng = self.max_lng.max(p.lng);
        self.max_lat = self.max_lat.max(p.lat);
    }

    /// Envelope grown by `pad` degrees on every side.
    #[inline]
    pub fn padded(self, pad: f64) -> BBox {
        BBox {
            min_lng: self.min_lng - pad,
            min_lat: self.min_lat - pad,
            max_lng: self.max_lng + pad,
            max_lat: self.max_lat + pad,
        }
    }

    #[inline]
    pub fn intersects(self, other: BBox) -> bool {
        self.min_lng <= other.max_lng
            && other.min_lng <= self.max_lng
            && self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
    }

    #[inline]
    pub fn contains(self, lng: f64, lat: f64) -> bool {
        lng >= self.min_lng && lng <= self.max_lng && lat >= self.min_lat && lat <= self.max_lat
    }
}
