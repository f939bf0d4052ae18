//! Node-network builder: trails in, wired graph out.
//!
//! The vertex set is the deduplicated collection of trail endpoints after
//! rounding to the configured decimal precision.  Vertex ids are assigned in
//! ascending `(lng, lat)` order of the rounded coordinates, so the id
//! assignment is a pure function of the trail set — rebuildable and
//! diff-stable across runs.

use std::collections::BTreeMap;

use tn_core::geo::haversine_m;
use tn_core::{Trail, VertexId};

use crate::error::{GraphError, GraphResult};
use crate::graph::{Edge, TrailGraph};

/// Haversine length of a 2-D coordinate chain, km.  Edge lengths are
/// derived from the *edge* geometry (endpoints pinned to vertex
/// coordinates), not copied from the trail, so stored lengths always match
/// the stored geometry exactly.
pub fn geom_length_km(coords: &[(f64, f64)]) -> f64 {
    coords
        .windows(2)
        .map(|w| haversine_m(w[0].0, w[0].1, w[1].0, w[1].1))
        .sum::<f64>()
        / 1_000.0
}

/// What the builder produced besides the graph itself.
#[derive(Clone, Debug, Default)]
pub struct BuildOutcome {
    /// Trails rejected because both endpoints rounded to the same vertex.
    pub rejected_loops: Vec<String>,
}

/// Build the routable graph from the (post-snap) trail set.
///
/// Trails are processed in ascending uuid order regardless of input order.
/// Every trail becomes one edge; a trail whose endpoints collapse to a
/// single vertex after rounding is rejected and reported (self-loop edges
/// are disallowed).
///
/// # Errors
///
/// [`GraphError::EmptyGraph`] when no edge survives.
pub fn build_graph(
    trails: &[Trail],
    decimals: u32,
) -> GraphResult<(TrailGraph, BuildOutcome)> {
    let mut order: Vec<&Trail> = trails.iter().collect();
    order.sort_by(|a, b| a.uuid.cmp(&b.uuid));

    // ── Vertex extraction ─────────────────────────────────────────────────
    //
    // BTreeMap keyed by quantised (lng, lat) gives the sorted id assignment
    // for free.
    let mut locations: BTreeMap<(i64, i64), (f64, f64)> = BTreeMap::new();
    for trail in &order {
        for p in [trail.geometry.first(), trail.geometry.last()].into_iter().flatten() {
            let r = p.rounded(decimals);
            locations.entry(p.key(decimals)).or_insert((r.lng, r.lat));
        }
    }

    let mut graph = TrailGraph::new();
    let mut vertex_ids: BTreeMap<(i64, i64), VertexId> = BTreeMap::new();
    for (key, (lng, lat)) in &locations {
        let id = graph.add_vertex(*lng, *lat);
        vertex_ids.insert(*key, id);
    }

    // ── Edge wiring ───────────────────────────────────────────────────────
    let mut outcome = BuildOutcome::default();
    for trail in &order {
        let (Some(first), Some(last)) = (trail.geometry.first(), trail.geometry.last()) else {
            continue;
        };
        let source = vertex_ids[&first.key(decimals)];
        let target = vertex_ids[&last.key(decimals)];
        if source == target {
            log::warn!(
                "rejecting trail {}: endpoints collapse to vertex {source} after rounding",
                trail.uuid
            );
            outcome.rejected_loops.push(trail.uuid.as_str().to_owned());
            continue;
        }

        // 2-D projection; endpoints pinned to the vertex coordinates so the
        // geometry/vertex coincidence holds exactly, not just after
        // rounding.
        let mut geom: Vec<(f64, f64)> = trail
            .geometry
            .points()
            .iter()
            .map(|p| (p.lng, p.lat))
            .collect();
        let sv = graph.vertex(source);
        let tv = graph.vertex(target);
        geom[0] = (sv.lng, sv.lat);
        let last_idx = geom.len() - 1;
        geom[last_idx] = (tv.lng, tv.lat);

        let length_km = geom_length_km(&geom);
        graph.add_edge(Edge {
            id:             Default::default(), // assigned by the arena
            source,
            target,
            geom,
            length_km,
            elevation_gain: trail.elevation_gain,
            elevation_loss: trail.elevation_loss,
            cost:           length_km,
            reverse_cost:   length_km,
            trail_uuid:     trail.uuid.as_str().to_owned(),
            name:           trail.name.clone(),
            old_id:         None,
            sub_id:         split_index(trail.uuid.as_str()),
        });
    }

    if graph.edge_count() == 0 {
        return Err(GraphError::EmptyGraph);
    }
    log::info!(
        "built network: {} vertices, {} edges ({} self-loop trails rejected)",
        graph.vertex_count(),
        graph.edge_count(),
        outcome.rejected_loops.len()
    );
    Ok((graph, outcome))
}

/// The trailing piece index of a split-child uuid (`"parent:3"` → 3).
fn split_index(uuid: &str) -> Option<u32> {
    uuid.rsplit_once(':')
        .and_then(|(_, tail)| tail.parse().ok())
}
