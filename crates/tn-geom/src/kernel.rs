//! Scalar kernel operations: validation, locate/closest-point, snapping,
//! simplification.
//!
//! # Metre-true projections
//!
//! Tolerances arrive in two units.  Degree tolerances (snap, buffer-split)
//! are compared in raw planar degrees, matching how the thresholds were
//! chosen.  Metre tolerances (T-intersection radius, merge radius) are
//! compared through a local equirectangular frame: longitude scaled by
//! `cos(lat)` of the query point, both axes converted with the shared
//! metres-per-degree constant.  At trail scale (segments ≪ 1 km) the frame
//! error is far below the 0.01 m point-merge tolerance.

use geo::Simplify;

use tn_core::geo::meters_per_degree;
use tn_core::{GeoPoint3, Line3};

use crate::convert::{force_2d, force_3d};
use crate::error::{GeomError, GeomResult};

// ── Validation ────────────────────────────────────────────────────────────────

/// Gate for every heavier kernel operation: at least two distinct vertices,
/// all coordinates finite, positive length.
pub fn validate(line: &Line3) -> GeomResult<()> {
    if line.num_points() < 2 {
        return Err(GeomError::InvalidGeometry(format!(
            "{} point(s), need at least 2",
            line.num_points()
        )));
    }
    for p in line.points() {
        if !p.is_finite() {
            return Err(GeomError::InvalidGeometry(format!("non-finite vertex {p}")));
        }
    }
    if line.length_m() <= 0.0 {
        return Err(GeomError::InvalidGeometry("zero-length line".into()));
    }
    Ok(())
}

// ── Locate / closest point ────────────────────────────────────────────────────

/// A resolved position on a polyline.
#[derive(Clone, Copy, Debug)]
pub struct LinePosition {
    /// Segment index: the position lies between vertices `seg` and `seg+1`.
    pub seg: usize,
    /// Parameter in `[0, 1]` along that segment (planar).
    pub t: f64,
    /// Haversine arc length from the line start to the position, metres.
    pub arc_m: f64,
    /// Distance from the query point to the position, metres.
    pub dist_m: f64,
    /// Distance from the query point to the position, planar degrees.
    pub dist_deg: f64,
    /// The position itself, elevation interpolated on the host segment.
    pub point: GeoPoint3,
}

/// Closest position on `line` to the planar location of `p`.
///
/// Comparison happens in a local metre frame anchored at `p`'s latitude, so
/// "closest" is metre-true rather than degree-true.
pub fn locate(line: &Line3, p: GeoPoint3) -> GeomResult<LinePosition> {
    validate(line)?;
    let (kx, ky) = meters_per_degree(p.lat);

    let mut best: Option<LinePosition> = None;
    let mut arc_before = 0.0;

    for (seg, w) in line.points().windows(2).enumerate() {
        let (a, b) = (w[0], w[1]);
        // Segment and query in the local metre frame.
        let ax = (a.lng - p.lng) * kx;
        let ay = (a.lat - p.lat) * ky;
        let bx = (b.lng - p.lng) * kx;
        let by = (b.lat - p.lat) * ky;

        let dx = bx - ax;
        let dy = by - ay;
        let len2 = dx * dx + dy * dy;
        let t = if len2 > 0.0 {
            (-(ax * dx + ay * dy) / len2).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let cx = ax + dx * t;
        let cy = ay + dy * t;
        let dist_m = (cx * cx + cy * cy).sqrt();

        if best.is_none_or(|b| dist_m < b.dist_m) {
            let point = GeoPoint3::new(
                a.lng + (b.lng - a.lng) * t,
                a.lat + (b.lat - a.lat) * t,
                a.elev + (b.elev - a.elev) * t,
            );
            let ddx = point.lng - p.lng;
            let ddy = point.lat - p.lat;
            best = Some(LinePosition {
                seg,
                t,
                arc_m: arc_before + a.distance_m(point),
                dist_m,
                dist_deg: (ddx * ddx + ddy * ddy).sqrt(),
                point,
            });
        }
        arc_before += a.distance_m(b);
    }

    // validate() guarantees at least one segment.
    Ok(best.expect("validated line has a segment"))
}

/// Closest point on `line` to `p`.
pub fn closest_point(line: &Line3, p: GeoPoint3) -> GeomResult<GeoPoint3> {
    Ok(locate(line, p)?.point)
}

/// Metre distance from `p` to `line`.
pub fn point_to_line_distance_m(line: &Line3, p: GeoPoint3) -> GeomResult<f64> {
    Ok(locate(line, p)?.dist_m)
}

/// Fractional position of the closest point to `p`, in `[0, 1]` by arc
/// length.
pub fn line_locate_point(line: &Line3, p: GeoPoint3) -> GeomResult<f64> {
    let pos = locate(line, p)?;
    let total = line.length_m();
    Ok((pos.arc_m / total).clamp(0.0, 1.0))
}

// ── Snapping ──────────────────────────────────────────────────────────────────

/// Return a copy of `a` with every vertex within `tol_deg` (planar degrees)
/// of `b` moved onto `b`: onto `b`'s nearest vertex when one is inside the
/// tolerance, otherwise onto the closest point of `b`'s nearest segment.
/// Vertices farther than `tol_deg` are untouched.  Elevations of moved
/// vertices are kept — identity is planar.
///
/// Symmetric use (`snap(a, b)` then `snap(b, a')`) is the caller's business,
/// as is re-validating the result.
pub fn snap(a: &Line3, b: &Line3, tol_deg: f64) -> GeomResult<Line3> {
    validate(a)?;
    validate(b)?;

    let snapped = a
        .points()
        .iter()
        .map(|&p| {
            // Nearest vertex of b first: vertex-to-vertex snaps keep the
            // split bookkeeping exact.
            let mut best_v: Option<(f64, GeoPoint3)> = None;
            for &q in b.points() {
                let dx = q.lng - p.lng;
                let dy = q.lat - p.lat;
                let d = (dx * dx + dy * dy).sqrt();
                if best_v.is_none_or(|(bd, _)| d < bd) {
                    best_v = Some((d, q));
                }
            }
            if let Some((d, q)) = best_v {
                if d <= tol_deg {
                    return GeoPoint3::new(q.lng, q.lat, p.elev);
                }
            }
            // Then the interior of b's segments.
            if let Ok(pos) = locate(b, p) {
                if pos.dist_deg <= tol_deg {
                    return GeoPoint3::new(pos.point.lng, pos.point.lat, p.elev);
                }
            }
            p
        })
        .collect();

    Ok(Line3::new(snapped))
}

// ── Simplification ────────────────────────────────────────────────────────────

/// Douglas–Peucker simplification with `eps_deg` planar tolerance.
/// Endpoints are always kept; elevations are re-lifted from the input by
/// nearest vertex.
pub fn simplify_preserve_topology(line: &Line3, eps_deg: f64) -> GeomResult<Line3> {
    validate(line)?;
    let shadow = force_2d(line).simplify(&eps_deg);
    Ok(force_3d(&shadow, line))
}
