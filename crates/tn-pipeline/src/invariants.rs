//! Cross-model invariant checks, executed before every graph-stage commit.
//!
//! A failure here is fatal: the runner skips the store write (so the staging
//! keeps its pre-stage state) and propagates `InvariantViolated`.  The
//! checks are deliberately cheap — one pass over edges, one over vertices —
//! so they can run unconditionally on every build and merge.

use rustc_hash::FxHashSet;

use tn_core::geo::quantize;
use tn_core::PipelineConfig;
use tn_graph::{geom_length_km, TrailGraph};

/// Allowed disagreement between a stored edge length and the length
/// recomputed from its geometry, km.  Rounding noise only.
const LENGTH_RECOMPUTE_TOL_KM: f64 = 1e-6;

/// Structural and metric invariants over the built graph:
///
/// 1. stored `length_km` matches the geometry,
/// 2. edge geometry starts/ends exactly on its vertices,
/// 3. no self-loop edges,
/// 4. degrees match incidence (via the graph's own self-check),
/// 5. no two live vertices share rounded coordinates,
/// 6. costs are finite and non-negative.
pub fn check_graph(graph: &TrailGraph, cfg: &PipelineConfig) -> Result<(), String> {
    graph.verify_consistent().map_err(|e| e.to_string())?;

    for edge in graph.live_edges() {
        let recomputed = geom_length_km(&edge.geom);
        if (recomputed - edge.length_km).abs() >= LENGTH_RECOMPUTE_TOL_KM {
            return Err(format!(
                "edge {}: stored length {:.9} km but geometry measures {:.9} km",
                edge.id, edge.length_km, recomputed
            ));
        }

        let sv = graph.vertex(edge.source);
        let tv = graph.vertex(edge.target);
        let start = edge.geom.first().copied();
        let end = edge.geom.last().copied();
        if start != Some((sv.lng, sv.lat)) {
            return Err(format!(
                "edge {}: geometry start {:?} does not coincide with source vertex {}",
                edge.id, start, sv.id
            ));
        }
        if end != Some((tv.lng, tv.lat)) {
            return Err(format!(
                "edge {}: geometry end {:?} does not coincide with target vertex {}",
                edge.id, end, tv.id
            ));
        }

        if edge.source == edge.target {
            return Err(format!("edge {} is a self-loop", edge.id));
        }

        for (label, cost) in [("cost", edge.cost), ("reverse_cost", edge.reverse_cost)] {
            if !cost.is_finite() || cost < 0.0 {
                return Err(format!("edge {}: {label} is {cost}", edge.id));
            }
        }
    }

    let mut seen: FxHashSet<(i64, i64)> = FxHashSet::default();
    for v in graph.live_vertices() {
        let key = (
            quantize(v.lng, cfg.round_decimals),
            quantize(v.lat, cfg.round_decimals),
        );
        if !seen.insert(key) {
            return Err(format!(
                "vertex {} duplicates another vertex's rounded coordinates ({}, {})",
                v.id, v.lng, v.lat
            ));
        }
    }

    Ok(())
}

/// Total edge length before vs. after a stage, within the configured
/// per-edge tolerance budget.
pub fn check_length_preserved(
    before_km: f64,
    after_km: f64,
    edge_count: usize,
    cfg: &PipelineConfig,
) -> Result<(), String> {
    let budget_m = cfg.length_tolerance_m * edge_count.max(1) as f64;
    let drift_m = (before_km - after_km).abs() * 1_000.0;
    if drift_m > budget_m {
        return Err(format!(
            "total length drifted {drift_m:.2} m (budget {budget_m:.2} m over {edge_count} edges)"
        ));
    }
    Ok(())
}
