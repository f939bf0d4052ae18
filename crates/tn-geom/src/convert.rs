//! Tagged 2-D / 3-D conversions.
//!
//! The working geometry is always the 3-D [`Line3`]; planar algorithms from
//! the `geo` crate run on a 2-D shadow produced by [`force_2d`].  Lifting
//! back to 3-D is explicit and lossy-by-contract: [`force_3d`] assigns each
//! 2-D vertex the elevation of the nearest vertex of the 3-D source line.
//! There is no implicit dimension change anywhere in the workspace.

use geo::{Coord, LineString, Point};

use tn_core::{GeoPoint3, Line3};

/// Project a 3-D polyline to a planar `LineString` (elevation dropped).
pub fn force_2d(line: &Line3) -> LineString<f64> {
    LineString::from(
        line.points()
            .iter()
            .map(|p| Coord { x: p.lng, y: p.lat })
            .collect::<Vec<_>>(),
    )
}

/// Lift a planar `LineString` back to 3-D using nearest-vertex elevation
/// from `source`.
///
/// Quadratic in vertex count, which is fine at trail scale (hundreds of
/// vertices); swap in an R-tree if sources ever grow past that.
pub fn force_3d(ls: &LineString<f64>, source: &Line3) -> Line3 {
    let pts = ls
        .coords()
        .map(|c| GeoPoint3::new(c.x, c.y, nearest_elevation(source, *c)))
        .collect();
    Line3::new(pts)
}

/// Elevation of the `source` vertex nearest to `c` (planar degree distance).
pub fn nearest_elevation(source: &Line3, c: Coord<f64>) -> f64 {
    let mut best = 0.0;
    let mut best_d2 = f64::INFINITY;
    for p in source.points() {
        let dx = p.lng - c.x;
        let dy = p.lat - c.y;
        let d2 = dx * dx + dy * dy;
        if d2 < best_d2 {
            best_d2 = d2;
            best = p.elev;
        }
    }
    best
}

/// 2-D shadow of a single point.
#[inline]
pub fn coord_of(p: GeoPoint3) -> Coord<f64> {
    Coord { x: p.lng, y: p.lat }
}

/// 3-D point at a planar coordinate with an explicit elevation.
#[inline]
pub fn lift(c: Coord<f64>, elev: f64) -> GeoPoint3 {
    GeoPoint3::new(c.x, c.y, elev)
}

/// `geo::Point` view of a 3-D point.
#[inline]
pub fn point_of(p: GeoPoint3) -> Point<f64> {
    Point::new(p.lng, p.lat)
}
