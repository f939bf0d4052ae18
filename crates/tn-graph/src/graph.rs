//! Arena-backed routable graph.
//!
//! # Data layout
//!
//! Vertices and edges live in flat `Vec`s indexed by their typed ids; all
//! cross-references are integer ids, never pointers, so the chain merger can
//! delete and insert freely without reference cycles.  Deletion tombstones
//! (`Vertex::alive`, `Option<Edge>`) keep ids stable for provenance —
//! nothing is ever renumbered after construction.
//!
//! Incidence lists are maintained eagerly on every mutation; `degree` is
//! always `incidence[v].len()` and the two are checked against each other by
//! [`TrailGraph::verify_consistent`].

use tn_core::{EdgeId, VertexId};

use crate::error::{GraphError, GraphResult};

// ── Records ───────────────────────────────────────────────────────────────────

/// A graph vertex: a unique rounded 2-D location.
#[derive(Clone, Debug)]
pub struct Vertex {
    pub id:     VertexId,
    pub lng:    f64,
    pub lat:    f64,
    pub degree: u32,
    /// Cleared when the chain merger contracts the vertex away.
    pub alive:  bool,
}

/// A routable edge.  `geom` starts at the source vertex's coordinates and
/// ends at the target's.
#[derive(Clone, Debug)]
pub struct Edge {
    pub id:             EdgeId,
    pub source:         VertexId,
    pub target:         VertexId,
    pub geom:           Vec<(f64, f64)>,
    pub length_km:      f64,
    pub elevation_gain: f64,
    pub elevation_loss: f64,
    pub cost:           f64,
    pub reverse_cost:   f64,
    pub trail_uuid:     String,
    pub name:           String,
    pub old_id:         Option<u32>,
    pub sub_id:         Option<u32>,
}

impl Edge {
    /// The endpoint that is not `v`.
    ///
    /// # Panics
    /// Debug-asserts that `v` is one of the endpoints.
    #[inline]
    pub fn other_end(&self, v: VertexId) -> VertexId {
        debug_assert!(v == self.source || v == self.target);
        if v == self.source { self.target } else { self.source }
    }
}

// ── TrailGraph ────────────────────────────────────────────────────────────────

/// The mutable routable network produced by the node-network builder and
/// refined by the chain merger.
pub struct TrailGraph {
    vertices:  Vec<Vertex>,
    edges:     Vec<Option<Edge>>,
    /// Per-vertex incident edge ids, kept sorted for deterministic
    /// iteration.
    incidence: Vec<Vec<EdgeId>>,
}

impl TrailGraph {
    pub fn new() -> Self {
        Self { vertices: Vec::new(), edges: Vec::new(), incidence: Vec::new() }
    }

    // ── Construction primitives ───────────────────────────────────────────

    /// Add a vertex at a rounded location; returns its id (sequential).
    pub fn add_vertex(&mut self, lng: f64, lat: f64) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(Vertex { id, lng, lat, degree: 0, alive: true });
        self.incidence.push(Vec::new());
        id
    }

    /// Add an edge; wires the incidence lists and degrees of both
    /// endpoints.  The id in `edge` is overwritten with the arena slot.
    pub fn add_edge(&mut self, mut edge: Edge) -> EdgeId {
        let id = EdgeId(self.edges.len() as u32);
        edge.id = id;
        let (s, t) = (edge.source, edge.target);
        self.edges.push(Some(edge));
        self.attach(s, id);
        self.attach(t, id);
        id
    }

    fn attach(&mut self, v: VertexId, e: EdgeId) {
        let list = &mut self.incidence[v.index()];
        // Insertion sort keeps the list ordered without a full re-sort.
        let pos = list.partition_point(|&x| x < e);
        list.insert(pos, e);
        self.vertices[v.index()].degree = list.len() as u32;
    }

    fn detach(&mut self, v: VertexId, e: EdgeId) {
        let list = &mut self.incidence[v.index()];
        if let Ok(pos) = list.binary_search(&e) {
            list.remove(pos);
        }
        self.vertices[v.index()].degree = list.len() as u32;
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Tombstone an edge and update its endpoints' degrees.
    pub fn remove_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.edges[id.index()].take()?;
        self.detach(edge.source, id);
        self.detach(edge.target, id);
        Some(edge)
    }

    /// Tombstone a vertex.  Callers must have removed its edges first.
    pub fn remove_vertex(&mut self, id: VertexId) {
        debug_assert!(self.incidence[id.index()].is_empty());
        self.vertices[id.index()].alive = false;
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.index()]
    }

    #[inline]
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.index()).and_then(|e| e.as_ref())
    }

    /// Incident edge ids of `v`, ascending.
    #[inline]
    pub fn incident_edges(&self, v: VertexId) -> &[EdgeId] {
        &self.incidence[v.index()]
    }

    /// Arena capacity (including tombstones) — the bound for dense
    /// per-vertex scratch arrays.
    #[inline]
    pub fn vertex_slots(&self) -> usize {
        self.vertices.len()
    }

    pub fn live_vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.iter().filter(|v| v.alive)
    }

    pub fn live_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter_map(|e| e.as_ref())
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.iter().filter(|v| v.alive).count()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_some()).count()
    }

    /// Total length over live edges, km.
    pub fn total_length_km(&self) -> f64 {
        self.live_edges().map(|e| e.length_km).sum()
    }

    // ── Self-check ────────────────────────────────────────────────────────

    /// Structural consistency: every edge endpoint is a live vertex whose
    /// incidence list contains the edge, every degree matches its list, and
    /// tombstoned vertices have no incident edges.
    pub fn verify_consistent(&self) -> GraphResult<()> {
        for edge in self.live_edges() {
            for v in [edge.source, edge.target] {
                let vertex = &self.vertices[v.index()];
                if !vertex.alive {
                    return Err(GraphError::Inconsistent(format!(
                        "edge {} references dead vertex {v}",
                        edge.id
                    )));
                }
                if self.incidence[v.index()].binary_search(&edge.id).is_err() {
                    return Err(GraphError::Inconsistent(format!(
                        "edge {} missing from incidence of {v}",
                        edge.id
                    )));
                }
            }
        }
        for vertex in &self.vertices {
            let listed = self.incidence[vertex.id.index()].len() as u32;
            if vertex.degree != listed {
                return Err(GraphError::Inconsistent(format!(
                    "vertex {} degree {} but {} incident edges",
                    vertex.id, vertex.degree, listed
                )));
            }
            if !vertex.alive && listed != 0 {
                return Err(GraphError::Inconsistent(format!(
                    "dead vertex {} still has {} incident edges",
                    vertex.id, listed
                )));
            }
        }
        Ok(())
    }
}

impl Default for TrailGraph {
    fn default() -> Self {
        Self::new()
    }
}
