//! Shortest-path routing over the trail graph.
//!
//! Used by the connectivity analyzer's smoke samples; kept public because
//! downstream recommendation engines route over the same structure.
//!
//! # Cost units
//!
//! Edge costs are integer millimetres (`length_km × 1e6`, rounded).
//! Integer costs make the heap ordering total and the tie-break on
//! `VertexId` deterministic — two runs over the same graph always return
//! the same route.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tn_core::{EdgeId, VertexId};

use crate::graph::TrailGraph;

/// The result of a routing query: ordered edge ids and the total length.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Edges to traverse in order, from source to destination.
    pub edges: Vec<EdgeId>,
    pub length_km: f64,
}

impl Route {
    /// `true` if source and destination were the same vertex.
    pub fn is_trivial(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Edge cost in integer millimetres.
#[inline]
fn cost_mm(length_km: f64) -> u64 {
    (length_km * 1_000_000.0).round().max(0.0) as u64
}

/// Dijkstra over the undirected live graph.  Returns `None` when `to` is
/// unreachable from `from`.
pub fn shortest_path(graph: &TrailGraph, from: VertexId, to: VertexId) -> Option<Route> {
    if from == to {
        return Some(Route { edges: vec![], length_km: 0.0 });
    }

    let n = graph.vertex_slots();
    // dist[v] = best known cost (mm) to reach v.
    let mut dist = vec![u64::MAX; n];
    // prev_edge[v] = EdgeId that reached v; EdgeId::INVALID for unreached.
    let mut prev_edge = vec![EdgeId::INVALID; n];

    dist[from.index()] = 0;

    // Min-heap: Reverse makes BinaryHeap (max) behave as min-heap.
    // Secondary key VertexId ensures deterministic tie-breaking.
    let mut heap: BinaryHeap<Reverse<(u64, VertexId)>> = BinaryHeap::new();
    heap.push(Reverse((0, from)));

    while let Some(Reverse((cost, node))) = heap.pop() {
        if node == to {
            return Some(reconstruct(graph, &prev_edge, from, to, cost));
        }
        // Skip stale heap entries.
        if cost > dist[node.index()] {
            continue;
        }

        for &eid in graph.incident_edges(node) {
            let Some(edge) = graph.edge(eid) else { continue };
            let neighbor = edge.other_end(node);
            let new_cost = cost.saturating_add(cost_mm(edge.length_km));

            if new_cost < dist[neighbor.index()] {
                dist[neighbor.index()] = new_cost;
                prev_edge[neighbor.index()] = eid;
                heap.push(Reverse((new_cost, neighbor)));
            }
        }
    }

    None
}

fn reconstruct(
    graph: &TrailGraph,
    prev_edge: &[EdgeId],
    from: VertexId,
    to: VertexId,
    total_mm: u64,
) -> Route {
    let mut edges = Vec::new();
    let mut cur = to;
    while cur != from {
        let e = prev_edge[cur.index()];
        if e == EdgeId::INVALID {
            break;
        }
        edges.push(e);
        cur = graph.edge(e).expect("route edge is live").other_end(cur);
    }
    edges.reverse();
    Route {
        edges,
        length_km: total_mm as f64 / 1_000_000.0,
    }
}
