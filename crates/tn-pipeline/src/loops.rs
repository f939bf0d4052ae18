//! Loop decomposition (the first geometry stage).
//!
//! Trails that touch themselves cannot become edges of a planar graph: the
//! touch point must be a vertex.  This stage rewrites every non-simple
//! trail as a set of simple children:
//!
//! - a self-touching open trail is densified (to stabilise the cut
//!   positions) and split at every touch point;
//! - a closed ring is split at the vertex farthest from the closure point,
//!   leaving two arcs that the chain merger will later preserve as a
//!   bubble.
//!
//! Children re-enter the worklist: cutting a lasso at its touch point
//! leaves a closed-ring child that needs the ring treatment in turn.  The
//! worklist drains because every decomposition yields strictly shorter
//! pieces.  Decomposition failure (a pathological input that yields no
//! pieces) keeps the original trail and flags it — never fatal.

use std::collections::{BTreeMap, VecDeque};

use tn_core::{Trail, TrailUuid, POINT_MERGE_TOL_M};
use tn_geom::{self_touch_points, split_at_points, split_ring};

use crate::stage::StageCtx;

/// Run the decomposer over the full trail set, returning the rewritten set.
pub fn decompose_loops(trails: Vec<Trail>, ctx: &mut StageCtx<'_>) -> Vec<Trail> {
    ctx.report.inputs = trails.len() as u64;

    let mut pending: Vec<Trail> = trails;
    pending.sort_by(|a, b| a.uuid.cmp(&b.uuid));
    let mut worklist: VecDeque<Trail> = pending.into();
    let mut out: BTreeMap<TrailUuid, Trail> = BTreeMap::new();

    while let Some(trail) = worklist.pop_front() {
        if ctx.out_of_time() {
            out.insert(trail.uuid.clone(), trail);
            continue; // drain the remainder untouched
        }
        match decompose_one(&trail, ctx) {
            Some(children) => {
                ctx.report.splits += 1;
                for child in children {
                    worklist.push_back(child);
                }
            }
            None => {
                out.insert(trail.uuid.clone(), trail);
            }
        }
    }

    ctx.report.outputs = out.len() as u64;
    out.into_values().collect()
}

/// Decompose a single trail.  `Some(children)` when it was split (children
/// still need checking), `None` when it is simple or must be kept as-is.
fn decompose_one(trail: &Trail, ctx: &mut StageCtx<'_>) -> Option<Vec<Trail>> {
    let cfg = ctx.config;
    let decimals = cfg.round_decimals;

    if trail.geometry.is_closed(decimals) {
        return match split_ring(&trail.geometry) {
            Ok((first, second)) => {
                log::debug!("ring {} decomposed into two arcs", trail.uuid);
                Some(vec![
                    trail.derive_child(1, first),
                    trail.derive_child(2, second),
                ])
            }
            Err(e) => {
                ctx.report
                    .skip(trail.uuid.as_str(), "loop_decompose_failed", e.to_string());
                None
            }
        };
    }

    let touches = self_touch_points(&trail.geometry, decimals);
    if touches.is_empty() {
        return None;
    }

    // Densify before cutting so every touch has a nearby vertex to anchor
    // to, then split at each touch.
    let densified = trail.geometry.densified(cfg.densify_interval_m);
    match split_at_points(
        &densified,
        &touches,
        cfg.split_buffer_degrees,
        cfg.min_segment_m,
        POINT_MERGE_TOL_M,
    ) {
        Ok(pieces) if pieces.len() > 1 => {
            log::debug!(
                "trail {} decomposed at {} self-touch(es) into {} pieces",
                trail.uuid,
                touches.len(),
                pieces.len()
            );
            Some(
                pieces
                    .into_iter()
                    .enumerate()
                    .map(|(n, piece)| trail.derive_child(n + 1, piece))
                    .collect(),
            )
        }
        Ok(_) => {
            // Every cut was filtered out (touches at the ends, pieces under
            // the minimum) — the trail stays as it is.
            ctx.report.skip(
                trail.uuid.as_str(),
                "loop_decompose_failed",
                "no piece survived the minimum-segment filter",
            );
            None
        }
        Err(e) => {
            ctx.report
                .skip(trail.uuid.as_str(), "invalid_geometry", e.to_string());
            None
        }
    }
}
