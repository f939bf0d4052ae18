//! Intersection splitting (the largest stage).
//!
//! Two passes over the trail set, each run to fixpoint:
//!
//! - **Pass A** finds trails that geometrically cross.  Each pair is
//!   rounded, mutually snapped, and intersected; every 0-dimensional
//!   result point splits *both* trails.  Collinear overlaps are reported
//!   and skipped.
//! - **Pass B** finds near-miss T-intersections: a trail endpoint within
//!   the configured radius of another trail's interior.  The host is split
//!   at the closest point and the toucher's endpoint is rewritten onto it,
//!   materialising the junction as a shared location.  The toucher itself
//!   is never split.
//!
//! The schedule is A→fixpoint, B→fixpoint, A→fixpoint again (a T-split can
//! expose a new crossing).  Pairs are processed in ascending
//! `(uuid1, uuid2)` order and children re-enter the worklist under their
//! own uuids, so the whole stage is deterministic.  Per-pair failures are
//! recorded and skipped; nothing here aborts the run.

use std::collections::BTreeMap;

use rstar::{RTree, RTreeObject, AABB};

use tn_core::geo::meters_per_degree;
use tn_core::{GeoPoint3, Trail, TrailUuid, POINT_MERGE_TOL_M};
use tn_geom::{intersections, locate, snap, split_at_point, split_at_points, GeomError, GeomResult};

use crate::stage::StageCtx;

/// Run the splitter over the full trail set.
pub fn split_intersections(trails: Vec<Trail>, ctx: &mut StageCtx<'_>) -> Vec<Trail> {
    ctx.report.inputs = trails.len() as u64;

    let mut map: BTreeMap<TrailUuid, Trail> = trails
        .into_iter()
        .map(|t| (t.uuid.clone(), t))
        .collect();

    run_to_fixpoint(&mut map, ctx, pass_a);
    run_to_fixpoint(&mut map, ctx, pass_b);
    // New shared endpoints from Pass B can create fresh crossing
    // candidates among the split children.
    run_to_fixpoint(&mut map, ctx, pass_a);

    ctx.report.outputs = map.len() as u64;
    map.into_values().collect()
}

fn run_to_fixpoint(
    map: &mut BTreeMap<TrailUuid, Trail>,
    ctx: &mut StageCtx<'_>,
    pass: fn(&mut BTreeMap<TrailUuid, Trail>, &mut StageCtx<'_>) -> bool,
) {
    loop {
        if ctx.report.partial {
            return;
        }
        if !pass(map, ctx) {
            return;
        }
    }
}

// ── Spatial candidate index ───────────────────────────────────────────────────

struct TrailEnvelope {
    uuid: TrailUuid,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for TrailEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

fn build_index(map: &BTreeMap<TrailUuid, Trail>, pad_deg: f64) -> RTree<TrailEnvelope> {
    let entries: Vec<TrailEnvelope> = map
        .values()
        .map(|t| {
            let bb = t.bbox.padded(pad_deg);
            TrailEnvelope {
                uuid: t.uuid.clone(),
                aabb: AABB::from_corners([bb.min_lng, bb.min_lat], [bb.max_lng, bb.max_lat]),
            }
        })
        .collect();
    RTree::bulk_load(entries)
}

// ── Pass A: exact X/Y crossings ───────────────────────────────────────────────

fn pass_a(map: &mut BTreeMap<TrailUuid, Trail>, ctx: &mut StageCtx<'_>) -> bool {
    let pad = ctx.config.snap_tol_degrees;
    let index = build_index(map, pad);

    // Candidate pairs in ascending (uuid1, uuid2) order.  The map is
    // iterated sorted; per-anchor candidates are sorted before use.
    let mut pairs: Vec<(TrailUuid, TrailUuid)> = Vec::new();
    for (uuid, trail) in map.iter() {
        let bb = trail.bbox.padded(pad);
        let query = AABB::from_corners([bb.min_lng, bb.min_lat], [bb.max_lng, bb.max_lat]);
        let mut others: Vec<TrailUuid> = index
            .locate_in_envelope_intersecting(&query)
            .filter(|e| e.uuid > *uuid)
            .map(|e| e.uuid.clone())
            .collect();
        others.sort();
        pairs.extend(others.into_iter().map(|o| (uuid.clone(), o)));
    }

    let mut changed = false;
    for (u1, u2) in pairs {
        if ctx.out_of_time() {
            break;
        }
        // A split earlier in this pass may have retired either side; the
        // children get their own pairs next iteration.
        if !map.contains_key(&u1) || !map.contains_key(&u2) {
            continue;
        }

        match split_crossing_pair(map, &u1, &u2, ctx) {
            Ok(true) => changed = true,
            Ok(false) => {}
            Err(e) => {
                let reason = match e {
                    GeomError::DegenerateSplit(_) => "degenerate_split",
                    GeomError::InvalidGeometry(_) => "invalid_geometry",
                };
                log::warn!("skipping pair {u1}×{u2}: {e}");
                ctx.report.skip(format!("{u1}×{u2}"), reason, e.to_string());
            }
        }
    }
    changed
}

/// Intersect one candidate pair and split both sides at every crossing
/// point.  Returns whether anything was rewritten.
fn split_crossing_pair(
    map: &mut BTreeMap<TrailUuid, Trail>,
    u1: &TrailUuid,
    u2: &TrailUuid,
    ctx: &mut StageCtx<'_>,
) -> GeomResult<bool> {
    let cfg = ctx.config;
    let t1 = &map[u1];
    let t2 = &map[u2];

    // Round away float noise, then snap each line onto the other so the
    // intersection points land on shared vertices wherever possible.
    let r1 = t1.geometry.rounded(cfg.round_decimals);
    let r2 = t2.geometry.rounded(cfg.round_decimals);
    let s1 = snap(&r1, &r2, cfg.snap_tol_degrees)?;
    let s2 = snap(&r2, &s1, cfg.snap_tol_degrees)?;

    let found = intersections(&s1, &s2, POINT_MERGE_TOL_M)?;
    for (start, end) in &found.overlaps {
        ctx.report.skip(
            format!("{u1}×{u2}"),
            "overlap_skipped",
            format!("collinear overlap of {:.1} m", start.distance_m(*end)),
        );
    }
    if found.points.is_empty() {
        return Ok(false);
    }

    let pieces1 = split_at_points(
        &s1,
        &found.points,
        cfg.split_buffer_degrees,
        cfg.min_segment_m,
        POINT_MERGE_TOL_M,
    )?;
    let pieces2 = split_at_points(
        &s2,
        &found.points,
        cfg.split_buffer_degrees,
        cfg.min_segment_m,
        POINT_MERGE_TOL_M,
    )?;

    let mut changed = false;
    if pieces1.len() > 1 {
        let parent = map.remove(u1).expect("pair member present");
        log::debug!("{u1} split into {} pieces at crossing with {u2}", pieces1.len());
        ctx.report.splits += pieces1.len() as u64 - 1;
        for (n, piece) in pieces1.into_iter().enumerate() {
            let child = parent.derive_child(n + 1, piece);
            map.insert(child.uuid.clone(), child);
        }
        changed = true;
    }
    if pieces2.len() > 1 {
        let parent = map.remove(u2).expect("pair member present");
        log::debug!("{u2} split into {} pieces at crossing with {u1}", pieces2.len());
        ctx.report.splits += pieces2.len() as u64 - 1;
        for (n, piece) in pieces2.into_iter().enumerate() {
            let child = parent.derive_child(n + 1, piece);
            map.insert(child.uuid.clone(), child);
        }
        changed = true;
    }
    Ok(changed)
}

// ── Pass B: near-miss T-intersections ─────────────────────────────────────────

fn pass_b(map: &mut BTreeMap<TrailUuid, Trail>, ctx: &mut StageCtx<'_>) -> bool {
    let tol_m = ctx.config.t_intersection_tol_m;
    if tol_m <= 0.0 {
        return false;
    }

    // Endpoint worklist in (uuid, end) order; coordinates are re-read from
    // the live map because an earlier endpoint may have rewritten them.
    let endpoints: Vec<(TrailUuid, bool)> = map
        .keys()
        .flat_map(|u| [(u.clone(), true), (u.clone(), false)])
        .collect();

    let index = build_index(map, 0.0);
    let mut changed = false;

    'endpoints: for (uuid, is_start) in endpoints {
        if ctx.out_of_time() {
            break;
        }
        let Some(trail) = map.get(&uuid) else { continue }; // retired by a host split
        let Some(endpoint) = (if is_start {
            trail.geometry.first()
        } else {
            trail.geometry.last()
        }) else {
            continue;
        };

        // Conservative degree pad around the endpoint for the bbox query.
        let (m_lng, m_lat) = meters_per_degree(endpoint.lat);
        let pad_lng = tol_m / m_lng.max(1.0);
        let pad_lat = tol_m / m_lat;
        let query = AABB::from_corners(
            [endpoint.lng - pad_lng, endpoint.lat - pad_lat],
            [endpoint.lng + pad_lng, endpoint.lat + pad_lat],
        );
        let mut hosts: Vec<TrailUuid> = index
            .locate_in_envelope_intersecting(&query)
            .filter(|e| e.uuid != uuid)
            .map(|e| e.uuid.clone())
            .collect();
        hosts.sort();

        for host_uuid in hosts {
            let Some(host) = map.get(&host_uuid) else { continue }; // stale index entry
            let decimals = ctx.config.round_decimals;

            // Already meeting at a shared endpoint — nothing to materialise.
            let shares_end = [host.geometry.first(), host.geometry.last()]
                .into_iter()
                .flatten()
                .any(|p| p.key(decimals) == endpoint.key(decimals));
            if shares_end {
                continue;
            }

            let pos = match locate(&host.geometry, endpoint) {
                Ok(pos) => pos,
                Err(e) => {
                    ctx.report
                        .skip(host_uuid.as_str(), "invalid_geometry", e.to_string());
                    continue;
                }
            };
            if pos.dist_m > tol_m {
                continue;
            }

            match split_at_point(
                &host.geometry,
                pos.point,
                ctx.config.split_buffer_degrees,
                ctx.config.min_segment_m,
            ) {
                Ok((first, second)) => {
                    let parent = map.remove(&host_uuid).expect("host present");
                    log::debug!(
                        "T-intersection: {uuid} endpoint within {:.2} m of {host_uuid}; host split",
                        pos.dist_m
                    );
                    for (n, piece) in [first, second].into_iter().enumerate() {
                        let child = parent.derive_child(n + 1, piece);
                        map.insert(child.uuid.clone(), child);
                    }

                    // Rewrite the toucher's endpoint onto the junction so
                    // the three trails share one location.  Elevation stays
                    // the toucher's own — identity is planar.
                    let junction =
                        GeoPoint3::new(pos.point.lng, pos.point.lat, endpoint.elev);
                    let toucher = map.get_mut(&uuid).expect("toucher present");
                    let rewritten = if is_start {
                        toucher.geometry.with_first(junction)
                    } else {
                        toucher.geometry.with_last(junction)
                    };
                    toucher.set_geometry(rewritten);

                    ctx.report.splits += 1;
                    changed = true;
                    continue 'endpoints; // further hosts next iteration
                }
                Err(e @ GeomError::DegenerateSplit(_)) => {
                    // The closest point is too near the host's end; the
                    // snapper/gap-filler owns that case.
                    ctx.report.skip(
                        format!("{uuid}→{host_uuid}"),
                        "degenerate_split",
                        e.to_string(),
                    );
                }
                Err(e) => {
                    ctx.report.skip(
                        format!("{uuid}→{host_uuid}"),
                        "invalid_geometry",
                        e.to_string(),
                    );
                }
            }
        }
    }
    changed
}
