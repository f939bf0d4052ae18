//! 3-D polyline type.
//!
//! `Line3` is the working geometry of a trail: an ordered sequence of
//! `GeoPoint3` vertices.  It owns the scalar computations every stage needs
//! (arc length, elevation profile, envelope) so that cached columns are
//! always derived through one code path.
//!
//! Projection to 2-D and the heavier kernel operations (simplify, snap,
//! split, intersect) live in `tn-geom`; this type deliberately has no
//! dependency on planar geometry crates.

use crate::geo::{BBox, GeoPoint3};

/// An ordered 3-D polyline.  At least 2 distinct vertices everywhere the
/// pipeline hands one around; construction itself does not enforce this —
/// the geometry kernel's `validate` is the gate.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Line3(Vec<GeoPoint3>);

impl Line3 {
    #[inline]
    pub fn new(points: Vec<GeoPoint3>) -> Self {
        Line3(points)
    }

    #[inline]
    pub fn points(&self) -> &[GeoPoint3] {
        &self.0
    }

    #[inline]
    pub fn into_points(self) -> Vec<GeoPoint3> {
        self.0
    }

    #[inline]
    pub fn num_points(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn first(&self) -> Option<GeoPoint3> {
        self.0.first().copied()
    }

    #[inline]
    pub fn last(&self) -> Option<GeoPoint3> {
        self.0.last().copied()
    }

    /// `true` when first and last vertex agree at `decimals` places.
    pub fn is_closed(&self, decimals: u32) -> bool {
        match (self.first(), self.last()) {
            (Some(a), Some(b)) => self.0.len() > 2 && a.key(decimals) == b.key(decimals),
            _ => false,
        }
    }

    // ── Derived scalars ───────────────────────────────────────────────────

    /// Haversine arc length in metres.
    pub fn length_m(&self) -> f64 {
        self.0
            .windows(2)
            .map(|w| w[0].distance_m(w[1]))
            .sum()
    }

    /// `(gain, loss, min, max, avg)` over the elevation profile, metres.
    ///
    /// Gain sums positive vertex-to-vertex deltas, loss sums the magnitudes
    /// of negative ones.  Average is the plain vertex mean (matches how the
    /// source data caches it — not length-weighted).
    pub fn elevation_profile(&self) -> (f64, f64, f64, f64, f64) {
        if self.0.is_empty() {
            return (0.0, 0.0, 0.0, 0.0, 0.0);
        }
        let mut gain = 0.0;
        let mut loss = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;

        for p in &self.0 {
            min = min.min(p.elev);
            max = max.max(p.elev);
            sum += p.elev;
        }
        for w in self.0.windows(2) {
            let d = w[1].elev - w[0].elev;
            if d > 0.0 {
                gain += d;
            } else {
                loss -= d;
            }
        }
        (gain, loss, min, max, sum / self.0.len() as f64)
    }

    /// Lng/lat envelope over all vertices.
    pub fn bbox(&self) -> BBox {
        let mut bb = BBox::EMPTY;
        for &p in &self.0 {
            bb.expand(p);
        }
        bb
    }

    // ── Geometry rewrites ─────────────────────────────────────────────────

    /// Copy with vertex order reversed.
    pub fn reversed(&self) -> Line3 {
        let mut pts = self.0.clone();
        pts.reverse();
        Line3(pts)
    }

    /// Copy with lng/lat rounded to `decimals` places and consecutive
    /// duplicate vertices (after rounding) collapsed.
    pub fn rounded(&self, decimals: u32) -> Line3 {
        let mut pts: Vec<GeoPoint3> = Vec::with_capacity(self.0.len());
        for &p in &self.0 {
            let r = p.rounded(decimals);
            if pts.last().is_none_or(|prev| prev.key(decimals) != r.key(decimals)) {
                pts.push(r);
            }
        }
        Line3(pts)
    }

    /// Copy with interpolated vertices inserted so no segment exceeds
    /// `every_m` metres.  Interpolation is linear in lng, lat, and elev,
    /// which is exact enough at the 5 m default interval.
    pub fn densified(&self, every_m: f64) -> Line3 {
        if self.0.len() < 2 || every_m <= 0.0 {
            return self.clone();
        }
        let mut pts: Vec<GeoPoint3> = Vec::with_capacity(self.0.len());
        pts.push(self.0[0]);
        for w in self.0.windows(2) {
            let (a, b) = (w[0], w[1]);
            let seg_m = a.distance_m(b);
            let pieces = (seg_m / every_m).ceil().max(1.0) as usize;
            for i in 1..pieces {
                let t = i as f64 / pieces as f64;
                pts.push(GeoPoint3::new(
                    a.lng + (b.lng - a.lng) * t,
                    a.lat + (b.lat - a.lat) * t,
                    a.elev + (b.elev - a.elev) * t,
                ));
            }
            pts.push(b);
        }
        Line3(pts)
    }

    /// Append `other`'s vertices, skipping its first if it coincides with
    /// our last at `decimals` places.  The caller is responsible for
    /// orienting the pieces so the join is geometrically continuous.
    pub fn concat(&self, other: &Line3, decimals: u32) -> Line3 {
        let mut pts = self.0.clone();
        let mut it = other.0.iter();
        if let (Some(tail), Some(head)) = (pts.last(), other.0.first()) {
            if tail.key(decimals) == head.key(decimals) {
                it.next();
            }
        }
        pts.extend(it.copied());
        Line3(pts)
    }

    /// Replace the first vertex.
    pub fn with_first(&self, p: GeoPoint3) -> Line3 {
        let mut pts = self.0.clone();
        if let Some(slot) = pts.first_mut() {
            *slot = p;
        }
        Line3(pts)
    }

    /// Replace the last vertex.
    pub fn with_last(&self, p: GeoPoint3) -> Line3 {
        let mut pts = self.0.clone();
        if let Some(slot) = pts.last_mut() {
            *slot = p;
        }
        Line3(pts)
    }
}
