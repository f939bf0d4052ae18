//! Polyline splitting.
//!
//! Split points rarely lie bit-exactly on the host line: they come from
//! snapped intersections, closest-point projections, or another trail's
//! vertex.  Every splitter here therefore projects the requested point onto
//! the line first and accepts it when the projection distance is within the
//! buffer tolerance — the "buffer split" that replaces the degenerate
//! GeometryCollection cases a naive exact split produces.  The length change
//! introduced by cutting at the projection is bounded by the buffer radius.

use tn_core::{GeoPoint3, Line3};

use crate::error::{GeomError, GeomResult};
use crate::kernel::{locate, validate, LinePosition};

/// Precision used when testing whether a cut lands on an existing vertex.
const VERTEX_HIT_DECIMALS: u32 = 9;

/// Split `line` at every point of `pts` that projects within `buffer_deg`
/// planar degrees of it, returning the ordered pieces.
///
/// Cut positions are de-duplicated within `merge_tol_m` metres and filtered
/// so that every resulting piece is at least `min_segment_m` metres long —
/// a cut that would violate that is dropped, not an error.  Points that do
/// not project within the buffer are ignored (they belong to some other
/// geometry's split).
///
/// Returns a single-element vector (a clone of the input) when no cut
/// survives; callers treat `len() == 1` as "no split happened".
pub fn split_at_points(
    line: &Line3,
    pts: &[GeoPoint3],
    buffer_deg: f64,
    min_segment_m: f64,
    merge_tol_m: f64,
) -> GeomResult<Vec<Line3>> {
    validate(line)?;
    let total_m = line.length_m();

    // Project, filter by buffer, order along the line.
    let mut cuts: Vec<LinePosition> = Vec::new();
    for &p in pts {
        let pos = locate(line, p)?;
        if pos.dist_deg > buffer_deg {
            continue;
        }
        cuts.push(pos);
    }
    cuts.sort_by(|a, b| a.arc_m.total_cmp(&b.arc_m));

    // Merge near-coincident cuts, then enforce the minimum piece length
    // against both ends and between consecutive survivors.
    let mut accepted: Vec<LinePosition> = Vec::new();
    for cut in cuts {
        if let Some(prev) = accepted.last() {
            if cut.arc_m - prev.arc_m <= merge_tol_m {
                continue;
            }
        }
        accepted.push(cut);
    }
    accepted.retain(|c| c.arc_m >= min_segment_m && total_m - c.arc_m >= min_segment_m);
    let mut filtered: Vec<LinePosition> = Vec::new();
    for cut in accepted {
        if filtered
            .last()
            .is_none_or(|prev: &LinePosition| cut.arc_m - prev.arc_m >= min_segment_m)
        {
            filtered.push(cut);
        }
    }

    if filtered.is_empty() {
        return Ok(vec![line.clone()]);
    }
    Ok(cut_line(line, &filtered))
}

/// Split `line` at a single point, yielding exactly two pieces.
///
/// # Errors
///
/// - `InvalidGeometry` when `pt` does not project within `buffer_deg` of
///   the line.
/// - `DegenerateSplit` when either piece would be shorter than
///   `min_segment_m`.
pub fn split_at_point(
    line: &Line3,
    pt: GeoPoint3,
    buffer_deg: f64,
    min_segment_m: f64,
) -> GeomResult<(Line3, Line3)> {
    validate(line)?;
    let pos = locate(line, pt)?;
    if pos.dist_deg > buffer_deg {
        return Err(GeomError::InvalidGeometry(format!(
            "split point {pt} lies {:.2e} degrees off the line (buffer {buffer_deg:.2e})",
            pos.dist_deg
        )));
    }
    let total_m = line.length_m();
    if pos.arc_m < min_segment_m || total_m - pos.arc_m < min_segment_m {
        return Err(GeomError::DegenerateSplit(format!(
            "cut at {:.2} m of {:.2} m leaves a piece under {min_segment_m} m",
            pos.arc_m, total_m
        )));
    }
    let mut pieces = cut_line(line, &[pos]).into_iter();
    match (pieces.next(), pieces.next()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(GeomError::DegenerateSplit("cut produced fewer than two pieces".into())),
    }
}

/// Split a closed ring into two simple arcs at the vertex farthest (by arc
/// length) from the closure point.
///
/// # Errors
///
/// `InvalidGeometry` when the ring has fewer than four vertices — there is
/// no interior vertex to cut at.
pub fn split_ring(line: &Line3) -> GeomResult<(Line3, Line3)> {
    validate(line)?;
    let pts = line.points();
    if pts.len() < 4 {
        return Err(GeomError::InvalidGeometry(format!(
            "ring with {} vertices cannot be split into two arcs",
            pts.len()
        )));
    }

    // Farthest interior vertex by arc length from the start.
    let half = line.length_m() / 2.0;
    let mut arc = 0.0;
    let mut cut_idx = 1;
    let mut best_gap = f64::INFINITY;
    for (i, w) in pts.windows(2).enumerate() {
        arc += w[0].distance_m(w[1]);
        let idx = i + 1;
        if idx < pts.len() - 1 {
            let gap = (arc - half).abs();
            if gap < best_gap {
                best_gap = gap;
                cut_idx = idx;
            }
        }
    }

    let first = Line3::new(pts[..=cut_idx].to_vec());
    let second = Line3::new(pts[cut_idx..].to_vec());
    Ok((first, second))
}

// ── Cutting machinery ─────────────────────────────────────────────────────────

/// Cut `line` at the given positions (pre-sorted by `arc_m`, all interior).
fn cut_line(line: &Line3, cuts: &[LinePosition]) -> Vec<Line3> {
    let pts = line.points();
    let mut pieces: Vec<Line3> = Vec::with_capacity(cuts.len() + 1);
    let mut current: Vec<GeoPoint3> = vec![pts[0]];
    let mut cut_i = 0;

    for seg in 0..pts.len() - 1 {
        // Emit every cut that lands inside this segment, in t order.
        while cut_i < cuts.len() && cuts[cut_i].seg == seg {
            let p = cuts[cut_i].point;
            cut_i += 1;
            let on_last = current
                .last()
                .is_some_and(|l| l.key(VERTEX_HIT_DECIMALS) == p.key(VERTEX_HIT_DECIMALS));
            if !on_last {
                current.push(p);
            }
            if current.len() >= 2 {
                pieces.push(Line3::new(std::mem::replace(&mut current, vec![p])));
            }
        }
        let next = pts[seg + 1];
        let dup = current
            .last()
            .is_some_and(|l| l.key(VERTEX_HIT_DECIMALS) == next.key(VERTEX_HIT_DECIMALS));
        if !dup {
            current.push(next);
        }
    }

    if current.len() >= 2 {
        pieces.push(Line3::new(current));
    }
    pieces
}
