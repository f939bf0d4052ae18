//! `tn-graph` — routable network construction and refinement.
//!
//! # Crate layout
//!
//! | Module           | Contents                                              |
//! |------------------|-------------------------------------------------------|
//! | [`graph`]        | `TrailGraph` arena (vertices, edges, incidence)       |
//! | [`builder`]      | Vertex extraction + edge wiring from the trail set    |
//! | [`merge`]        | Degree-2 chain contraction                            |
//! | [`connectivity`] | Components, isolation report, smoke routes            |
//! | [`router`]       | Dijkstra over the undirected graph                    |
//! | [`error`]        | `GraphError`, `GraphResult`                           |

pub mod builder;
pub mod connectivity;
pub mod error;
pub mod graph;
pub mod merge;
pub mod router;


pub use builder::{build_graph, geom_length_km, BuildOutcome};
pub use connectivity::analyze;
pub use error::{GraphError, GraphResult};
pub use graph::{Edge, TrailGraph, Vertex};
pub use merge::{merge_degree2_chains, MergeOutcome};
pub use router::{shortest_path, Route};
