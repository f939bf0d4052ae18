//! Connectivity analysis: components, isolation, smoke routes.
//!
//! Reports, never mutates.  Components come from union-find over the live
//! edges; every live vertex (including degree-0 orphans) is its own
//! component until an edge joins it to another.

use rustc_hash::FxHashMap;

use tn_core::{ConnectivityReport, RunRng, SamplePath, VertexId};

use crate::graph::TrailGraph;
use crate::router::shortest_path;

/// Analyze `graph` and produce the run's connectivity report.
///
/// `samples` shortest-path probes are attempted between seeded-random
/// endpoint pairs inside the largest component — a cheap end-to-end check
/// that the built network actually routes.
pub fn analyze(graph: &TrailGraph, samples: usize, rng: &mut RunRng) -> ConnectivityReport {
    let mut report = ConnectivityReport::default();

    // ── Union-find over live edges ────────────────────────────────────────
    let mut uf = UnionFind::new(graph.vertex_slots());
    for edge in graph.live_edges() {
        uf.union(edge.source.index(), edge.target.index());
    }

    let mut component_members: FxHashMap<usize, Vec<VertexId>> = FxHashMap::default();
    for vertex in graph.live_vertices() {
        let root = uf.find(vertex.id.index());
        component_members.entry(root).or_default().push(vertex.id);
        if vertex.degree == 0 {
            report.isolated_vertices += 1;
        }
    }

    let mut components: Vec<Vec<VertexId>> = component_members.into_values().collect();
    // Largest first; vertex-id tie-break keeps the ordering stable.
    components.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.first().cmp(&b.first())));
    report.component_sizes = components.iter().map(|c| c.len()).collect();

    // ── Edge isolation ────────────────────────────────────────────────────
    for edge in graph.live_edges() {
        let d_source = graph.vertex(edge.source).degree;
        let d_target = graph.vertex(edge.target).degree;
        if d_source == 1 && d_target == 1 {
            report.isolated_edges += 1;
            report.dangling_edges += 1;
        } else if d_source == 1 || d_target == 1 {
            report.dangling_edges += 1;
        }
    }

    // ── Score ─────────────────────────────────────────────────────────────
    let total = graph.vertex_count();
    if total > 0 {
        report.connectivity_score = report.component_sizes[0] as f64 / total as f64;
    }

    // ── Smoke routes inside the largest component ─────────────────────────
    if let Some(largest) = components.first() {
        if largest.len() >= 2 {
            for _ in 0..samples {
                let a = *rng.choose(largest).expect("component is non-empty");
                let b = *rng.choose(largest).expect("component is non-empty");
                if a == b {
                    continue;
                }
                match shortest_path(graph, a, b) {
                    Some(route) => report.sample_paths.push(SamplePath {
                        from:      a,
                        to:        b,
                        hops:      route.edges.len(),
                        length_km: route.length_km,
                    }),
                    None => {
                        // Same component yet unroutable would mean the
                        // union-find and the graph disagree.
                        log::warn!("no route between {a} and {b} inside one component");
                    }
                }
            }
        }
    }

    log::info!(
        "connectivity: {} components, score {:.3}, {} isolated vertices, {} dangling edges",
        report.component_sizes.len(),
        report.connectivity_score,
        report.isolated_vertices,
        report.dangling_edges
    );
    report
}

// ── Union-find ────────────────────────────────────────────────────────────────

/// Path-halving union-find over dense indices.
struct UnionFind {
    parent: Vec<usize>,
    rank:   Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect(), rank: vec![0; n] }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}
