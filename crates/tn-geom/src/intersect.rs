//! Linestring × linestring intersection and self-intersection scans.
//!
//! Built as a segment-pair sweep over bbox-prefiltered pairs using the
//! `geo` crate's robust segment predicate, so callers get explicit control
//! over the two result dimensionalities the pipeline must distinguish:
//! 0-dimensional crossing points (split sites) and 1-dimensional collinear
//! overlaps (reported, never split).

use geo::Line;
use geo::line_intersection::{line_intersection, LineIntersection};

use tn_core::{GeoPoint3, Line3};

use crate::convert::coord_of;
use crate::error::GeomResult;
use crate::kernel::validate;

/// Result of intersecting two polylines.
#[derive(Clone, Debug, Default)]
pub struct LineIntersections {
    /// Crossing and touch points, deduplicated within the merge tolerance.
    /// Elevation is interpolated on the first line's hosting segment.
    pub points: Vec<GeoPoint3>,
    /// Collinear overlap extents as `(start, end)` pairs.
    pub overlaps: Vec<(GeoPoint3, GeoPoint3)>,
}

/// All intersection pieces between `a` and `b`.
///
/// Points closer than `merge_tol_m` metres collapse into the first one
/// found; the sweep order is deterministic (segment index order), so the
/// survivor is stable across runs.
pub fn intersections(a: &Line3, b: &Line3, merge_tol_m: f64) -> GeomResult<LineIntersections> {
    validate(a)?;
    validate(b)?;

    let mut out = LineIntersections::default();

    let b_pts = b.points();
    for aw in a.points().windows(2) {
        let (a0, a1) = (aw[0], aw[1]);
        let seg_a = Line::new(coord_of(a0), coord_of(a1));
        let (a_min_x, a_max_x) = minmax(a0.lng, a1.lng);
        let (a_min_y, a_max_y) = minmax(a0.lat, a1.lat);

        for bw in b_pts.windows(2) {
            let (b0, b1) = (bw[0], bw[1]);
            // Cheap envelope rejection before the robust predicate.
            let (b_min_x, b_max_x) = minmax(b0.lng, b1.lng);
            if b_max_x < a_min_x || b_min_x > a_max_x {
                continue;
            }
            let (b_min_y, b_max_y) = minmax(b0.lat, b1.lat);
            if b_max_y < a_min_y || b_min_y > a_max_y {
                continue;
            }

            let seg_b = Line::new(coord_of(b0), coord_of(b1));
            match line_intersection(seg_a, seg_b) {
                None => {}
                Some(LineIntersection::SinglePoint { intersection, .. }) => {
                    let p = lift_on_segment(a0, a1, intersection.x, intersection.y);
                    push_merged(&mut out.points, p, merge_tol_m);
                }
                Some(LineIntersection::Collinear { intersection }) => {
                    let s = lift_on_segment(a0, a1, intersection.start.x, intersection.start.y);
                    let e = lift_on_segment(a0, a1, intersection.end.x, intersection.end.y);
                    if s.distance_m(e) > 0.0 {
                        out.overlaps.push((s, e));
                    }
                }
            }
        }
    }

    Ok(out)
}

// ── Self-intersection ─────────────────────────────────────────────────────────

/// Locations where `line` touches itself: repeated interior vertices (after
/// rounding to `decimals`) and proper crossings between non-adjacent
/// segments.  The trivial first==last repetition of a closed ring is not
/// reported — ring handling is the loop decomposer's own case.
pub fn self_touch_points(line: &Line3, decimals: u32) -> Vec<GeoPoint3> {
    let pts = line.points();
    let n = pts.len();
    let mut touches: Vec<GeoPoint3> = Vec::new();
    let closed = line.is_closed(decimals);

    // Repeated vertex keys.
    for i in 0..n {
        for j in (i + 1)..n {
            if i == 0 && j == n - 1 && closed {
                continue;
            }
            if pts[i].key(decimals) == pts[j].key(decimals) && j > i + 1 {
                push_merged(&mut touches, pts[i], 0.01);
            }
        }
    }

    // Crossings between non-adjacent segments.
    for i in 0..n.saturating_sub(1) {
        for j in (i + 2)..n.saturating_sub(1) {
            if i == 0 && j == n - 2 && closed {
                continue; // ring closure: first and last segment share a vertex
            }
            let seg_i = Line::new(coord_of(pts[i]), coord_of(pts[i + 1]));
            let seg_j = Line::new(coord_of(pts[j]), coord_of(pts[j + 1]));
            if let Some(LineIntersection::SinglePoint { intersection, .. }) =
                line_intersection(seg_i, seg_j)
            {
                let p = lift_on_segment(pts[i], pts[i + 1], intersection.x, intersection.y);
                push_merged(&mut touches, p, 0.01);
            }
        }
    }

    touches
}

/// A line is simple when it neither closes on itself nor touches itself.
pub fn is_simple(line: &Line3, decimals: u32) -> bool {
    !line.is_closed(decimals) && self_touch_points(line, decimals).is_empty()
}

// ── Helpers ───────────────────────────────────────────────────────────────────

#[inline]
fn minmax(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}

/// 3-D point at planar `(x, y)` with elevation interpolated along the
/// `a0→a1` segment that hosts it.
fn lift_on_segment(a0: GeoPoint3, a1: GeoPoint3, x: f64, y: f64) -> GeoPoint3 {
    let dx = a1.lng - a0.lng;
    let dy = a1.lat - a0.lat;
    // Parameter from the dominant axis; both axes agree on a segment.
    let t = if dx.abs() >= dy.abs() {
        if dx != 0.0 { (x - a0.lng) / dx } else { 0.0 }
    } else if dy != 0.0 {
        (y - a0.lat) / dy
    } else {
        0.0
    };
    let t = t.clamp(0.0, 1.0);
    GeoPoint3::new(x, y, a0.elev + (a1.elev - a0.elev) * t)
}

/// Append `p` unless an accepted point lies within `tol_m` metres.
fn push_merged(points: &mut Vec<GeoPoint3>, p: GeoPoint3, tol_m: f64) {
    if points.iter().all(|q| q.distance_m(p) > tol_m) {
        points.push(p);
    }
}
