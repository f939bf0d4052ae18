//! Endpoint snapping and gap bridging.
//!
//! Two concerns, run in order over the post-split trail set:
//!
//! 1. **Coincident-endpoint merge** — endpoint clusters closer than the
//!    merge radius are rewritten onto one canonical location (the lowest
//!    `(uuid, end)` member's point), so vertex extraction later maps them
//!    to a single vertex regardless of rounding-bucket luck.
//! 2. **Gap bridging** — endpoint pairs from different trails separated by
//!    `[1 m, gap_tolerance_m]` get a straight Connector trail.  One bridge
//!    per location pair; re-runs see the existing connector and do
//!    nothing.  Gaps up to twice the tolerance are reported as unbridged.

use std::collections::BTreeMap;

use rstar::{RTree, RTreeObject, AABB};
use rustc_hash::FxHashSet;

use tn_core::geo::meters_per_degree;
use tn_core::{GeoPoint3, Line3, Trail, TrailUuid, BRIDGE_FLOOR_M};

use crate::stage::StageCtx;

/// Run the snapper/gap-filler over the full trail set.
pub fn snap_and_bridge(trails: Vec<Trail>, ctx: &mut StageCtx<'_>) -> Vec<Trail> {
    ctx.report.inputs = trails.len() as u64;

    let mut map: BTreeMap<TrailUuid, Trail> = trails
        .into_iter()
        .map(|t| (t.uuid.clone(), t))
        .collect();

    merge_coincident_endpoints(&mut map, ctx);
    bridge_gaps(&mut map, ctx);

    ctx.report.outputs = map.len() as u64;
    map.into_values().collect()
}

// ── Endpoint index ────────────────────────────────────────────────────────────

/// One trail endpoint in the spatial index.
struct EndpointEntry {
    point:    [f64; 2],
    uuid:     TrailUuid,
    is_start: bool,
}

impl RTreeObject for EndpointEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

fn endpoint_of(trail: &Trail, is_start: bool) -> Option<GeoPoint3> {
    if is_start {
        trail.geometry.first()
    } else {
        trail.geometry.last()
    }
}

fn build_endpoint_index(map: &BTreeMap<TrailUuid, Trail>) -> RTree<EndpointEntry> {
    let entries: Vec<EndpointEntry> = map
        .values()
        .flat_map(|t| {
            [(true, t.geometry.first()), (false, t.geometry.last())]
                .into_iter()
                .filter_map(|(is_start, p)| {
                    p.map(|p| EndpointEntry {
                        point: [p.lng, p.lat],
                        uuid: t.uuid.clone(),
                        is_start,
                    })
                })
        })
        .collect();
    RTree::bulk_load(entries)
}

/// Degree-padded query box of `radius_m` metres around `p`.
fn query_box(p: GeoPoint3, radius_m: f64) -> AABB<[f64; 2]> {
    let (m_lng, m_lat) = meters_per_degree(p.lat);
    let pad_lng = radius_m / m_lng.max(1.0);
    let pad_lat = radius_m / m_lat;
    AABB::from_corners(
        [p.lng - pad_lng, p.lat - pad_lat],
        [p.lng + pad_lng, p.lat + pad_lat],
    )
}

// ── Coincident-endpoint merge ─────────────────────────────────────────────────

fn merge_coincident_endpoints(map: &mut BTreeMap<TrailUuid, Trail>, ctx: &mut StageCtx<'_>) {
    let radius = ctx.config.merge_radius_m();
    let index = build_endpoint_index(map);

    let worklist: Vec<(TrailUuid, bool)> = map
        .keys()
        .flat_map(|u| [(u.clone(), true), (u.clone(), false)])
        .collect();
    let mut assigned: FxHashSet<(TrailUuid, bool)> = FxHashSet::default();

    for (uuid, is_start) in worklist {
        if ctx.out_of_time() {
            break;
        }
        if assigned.contains(&(uuid.clone(), is_start)) {
            continue;
        }
        let Some(anchor) = map.get(&uuid).and_then(|t| endpoint_of(t, is_start)) else {
            continue;
        };

        // Neighbors within the merge radius, excluding this trail's own
        // endpoints (a trail is never merged onto itself).
        let mut cluster: Vec<(TrailUuid, bool)> = index
            .locate_in_envelope_intersecting(&query_box(anchor, radius))
            .filter(|e| e.uuid != uuid)
            .filter(|e| !assigned.contains(&(e.uuid.clone(), e.is_start)))
            .filter(|e| {
                anchor.distance_m(GeoPoint3::new(e.point[0], e.point[1], 0.0)) <= radius
            })
            .map(|e| (e.uuid.clone(), e.is_start))
            .collect();
        cluster.sort();

        assigned.insert((uuid.clone(), is_start));
        if cluster.is_empty() {
            continue;
        }

        // The anchor is the lowest (uuid, end) still unassigned — its
        // location is canonical for the whole cluster.
        for (member_uuid, member_start) in cluster {
            assigned.insert((member_uuid.clone(), member_start));
            let trail = map.get_mut(&member_uuid).expect("cluster member present");
            let Some(current) = endpoint_of(trail, member_start) else { continue };
            if current.lng == anchor.lng && current.lat == anchor.lat {
                continue; // already exactly coincident
            }
            let snapped = GeoPoint3::new(anchor.lng, anchor.lat, current.elev);
            let rewritten = if member_start {
                trail.geometry.with_first(snapped)
            } else {
                trail.geometry.with_last(snapped)
            };
            trail.set_geometry(rewritten);
            log::debug!(
                "merged endpoint of {member_uuid} onto {uuid} ({:.3} m apart)",
                current.distance_m(anchor)
            );
            ctx.report.merges += 1;
        }
    }
}

// ── Gap bridging ──────────────────────────────────────────────────────────────

/// Location-pair key at vertex-identity precision, order-normalised.
type PairKey = ((i64, i64), (i64, i64));

fn pair_key(a: GeoPoint3, b: GeoPoint3, decimals: u32) -> PairKey {
    let (ka, kb) = (a.key(decimals), b.key(decimals));
    if ka <= kb { (ka, kb) } else { (kb, ka) }
}

fn bridge_gaps(map: &mut BTreeMap<TrailUuid, Trail>, ctx: &mut StageCtx<'_>) {
    let gap_tol = ctx.config.gap_tolerance_m;
    if gap_tol < BRIDGE_FLOOR_M {
        return;
    }
    let decimals = ctx.config.round_decimals;
    let index = build_endpoint_index(map);

    // Connectors from a previous run keep re-runs idempotent.
    let mut bridged: FxHashSet<PairKey> = map
        .values()
        .filter(|t| t.trail_type == "connector")
        .filter_map(|t| {
            let (a, b) = (t.geometry.first()?, t.geometry.last()?);
            Some(pair_key(a, b, decimals))
        })
        .collect();

    let worklist: Vec<(TrailUuid, bool)> = map
        .keys()
        .filter(|u| map[*u].trail_type != "connector")
        .flat_map(|u| [(u.clone(), true), (u.clone(), false)])
        .collect();

    let mut connectors: Vec<Trail> = Vec::new();
    for (uuid, is_start) in worklist {
        if ctx.out_of_time() {
            break;
        }
        let Some(a) = map.get(&uuid).and_then(|t| endpoint_of(t, is_start)) else {
            continue;
        };

        // Query out to twice the tolerance so unbridgeable near-gaps are
        // at least reported.
        let mut neighbors: Vec<(TrailUuid, bool, GeoPoint3)> = index
            .locate_in_envelope_intersecting(&query_box(a, gap_tol * 2.0))
            .filter(|e| e.uuid != uuid && map[&e.uuid].trail_type != "connector")
            .filter(|e| (uuid.clone(), is_start) < (e.uuid.clone(), e.is_start))
            .map(|e| {
                let p = endpoint_of(&map[&e.uuid], e.is_start).expect("endpoint exists");
                (e.uuid.clone(), e.is_start, p)
            })
            .collect();
        neighbors.sort_by(|x, y| (&x.0, x.1).cmp(&(&y.0, y.1)));

        for (other_uuid, other_start, b) in neighbors {
            let d = a.distance_m(b);
            if d < BRIDGE_FLOOR_M {
                continue; // coincident; the merge phase owns this band
            }
            let key = pair_key(a, b, decimals);
            if bridged.contains(&key) {
                continue;
            }
            if d > gap_tol {
                if d <= gap_tol * 2.0 {
                    ctx.report.skip(
                        format!("{uuid}↔{other_uuid}"),
                        "gap_unbridged",
                        format!("{d:.2} m exceeds gap tolerance {gap_tol} m"),
                    );
                }
                continue;
            }

            let end_tag = |s: bool| if s { "s" } else { "e" };
            let mut connector = Trail::new(
                TrailUuid::new(format!(
                    "connector:{uuid}/{}-{other_uuid}/{}",
                    end_tag(is_start),
                    end_tag(other_start)
                )),
                Line3::new(vec![a, b]),
            );
            connector.name = "Connector".to_owned();
            connector.trail_type = "connector".to_owned();
            connector.source = "gap_filler".to_owned();
            connector.region = map[&uuid].region.clone();

            log::debug!(
                "bridging {:.2} m gap between {uuid} and {other_uuid}",
                d
            );
            bridged.insert(key);
            connectors.push(connector);
            ctx.report.bridges += 1;
        }
    }

    for c in connectors {
        map.insert(c.uuid.clone(), c);
    }
}
