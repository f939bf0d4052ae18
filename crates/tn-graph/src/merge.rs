//! Degree-2 chain contraction.
//!
//! A vertex with exactly two incident edges contributes nothing to routing —
//! it is an artifact of how the source trails were cut.  The merger
//! contracts every maximal run of such vertices into one edge, preserving
//! combined length and elevation and composing provenance.
//!
//! # Determinism and termination
//!
//! Vertices are scanned in ascending id order, repeatedly, until a full
//! scan contracts nothing.  Each contraction strictly decreases the live
//! edge count, so the loop terminates; the fixed scan order makes the
//! surviving edge set and its composed provenance reproducible.  Running
//! the merger on its own output is a no-op.

use tn_core::VertexId;

use crate::graph::{Edge, TrailGraph};

/// Counters from one merger run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Contracted vertices (== merged edge pairs).
    pub contracted: u64,
    /// Degree-2 vertices left alone because contracting them would have
    /// collapsed a two-edge bubble into a self-loop.
    pub bubbles_kept: u64,
}

/// Contract every maximal degree-2 chain in `graph`.
pub fn merge_degree2_chains(graph: &mut TrailGraph) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    loop {
        let mut changed = false;

        for idx in 0..graph.vertex_slots() {
            let v = VertexId(idx as u32);
            if !graph.vertex(v).alive || graph.vertex(v).degree != 2 {
                continue;
            }
            let inc = graph.incident_edges(v);
            let (ea, eb) = (inc[0], inc[1]);
            if ea == eb {
                // Two references to one edge would mean a self-loop; the
                // builder rejects those, but stay defensive about order.
                continue;
            }

            let u = graph.edge(ea).expect("incident edge is live").other_end(v);
            let w = graph.edge(eb).expect("incident edge is live").other_end(v);
            if u == w {
                // The chain closed into a bubble; merging the last step
                // would create a self-loop edge, which is disallowed.
                outcome.bubbles_kept += 1;
                continue;
            }

            let e1 = graph.remove_edge(ea).expect("edge just observed");
            let e2 = graph.remove_edge(eb).expect("edge just observed");
            let merged = join_edges(&e1, &e2, v, u, w);
            graph.remove_vertex(v);
            graph.add_edge(merged);

            outcome.contracted += 1;
            changed = true;
        }

        if !changed {
            break;
        }
    }

    log::info!(
        "chain merge: {} vertices contracted, {} bubbles preserved",
        outcome.contracted,
        outcome.bubbles_kept
    );
    outcome
}

// ── Edge composition ──────────────────────────────────────────────────────────

/// Compose `e1` (incident to `u` and `v`) and `e2` (incident to `v` and
/// `w`) into one `u → w` edge through `v`.
fn join_edges(e1: &Edge, e2: &Edge, v: VertexId, u: VertexId, w: VertexId) -> Edge {
    // Orient both pieces so the walk runs u → v → w.  Reversing a piece
    // swaps its elevation gain and loss.
    let (g1, gain1, loss1) = oriented(e1, u);
    let (g2, gain2, loss2) = oriented(e2, v);

    let mut geom = g1;
    // Both pieces end/start exactly on v's coordinates; drop the duplicate.
    geom.extend(g2.into_iter().skip(1));

    let length_km = e1.length_km + e2.length_km;
    let name = compose_name(&e1.name, &e2.name);

    Edge {
        id:             Default::default(),
        source:         u,
        target:         w,
        geom,
        length_km,
        elevation_gain: gain1 + gain2,
        elevation_loss: loss1 + loss2,
        cost:           length_km,
        reverse_cost:   length_km,
        trail_uuid:     format!("merged:{}+{}", e1.trail_uuid, e2.trail_uuid),
        name,
        old_id:         None,
        sub_id:         None,
    }
}

/// `edge`'s geometry walked starting from `from`, with the elevation
/// columns matching that direction.
fn oriented(edge: &Edge, from: VertexId) -> (Vec<(f64, f64)>, f64, f64) {
    if edge.source == from {
        (edge.geom.clone(), edge.elevation_gain, edge.elevation_loss)
    } else {
        let mut g = edge.geom.clone();
        g.reverse();
        (g, edge.elevation_loss, edge.elevation_gain)
    }
}

fn compose_name(a: &str, b: &str) -> String {
    if a == b {
        return a.to_owned();
    }
    if a.is_empty() {
        return b.to_owned();
    }
    if b.is_empty() {
        return a.to_owned();
    }
    // Canonical composite: sorted so e1/e2 order doesn't leak through.
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    format!("{first} / {second}")
}
