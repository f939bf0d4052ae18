//! `tn-geom` — the geometry kernel for the trailnet pipeline.
//!
//! Every geometric primitive the higher stages need, in one place:
//!
//! | Module        | Contents                                                |
//! |---------------|---------------------------------------------------------|
//! | [`convert`]   | Tagged 2-D/3-D conversions (`force_2d`, `force_3d`)     |
//! | [`kernel`]    | Validation, locate/closest-point, snap, simplify        |
//! | [`intersect`] | Linestring intersections, self-touch scan, `is_simple`  |
//! | [`split`]     | Buffer splits, multi-point splits, ring splits          |
//! | [`error`]     | `GeomError`, `GeomResult`                               |
//!
//! All operations take WGS-84 lng/lat input.  Degree tolerances compare in
//! planar degrees; metre tolerances compare through local equirectangular
//! frames (see [`kernel`] docs).  Operations fail with
//! [`GeomError::InvalidGeometry`] on empty, zero-length, or non-finite
//! input — callers filter first with [`kernel::validate`].

pub mod convert;
pub mod error;
pub mod intersect;
pub mod kernel;
pub mod split;

#[cfg(test)]
mod tests;

pub use convert::{coord_of, force_2d, force_3d, lift, point_of};
pub use error::{GeomError, GeomResult};
pub use intersect::{intersections, is_simple, self_touch_points, LineIntersections};
pub use kernel::{
    closest_point, line_locate_point, locate, point_to_line_distance_m,
    simplify_preserve_topology, snap, validate, LinePosition,
};
pub use split::{split_at_point, split_at_points, split_ring};
