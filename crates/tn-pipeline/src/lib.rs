//! `tn-pipeline` — the trail-to-graph stage runner.
//!
//! # Stage sequence
//!
//! ```text
//! trails table ─▶ ① decompose_loops        self-touching trails → simple pieces
//!              ─▶ ② split_intersections    X/Y crossings + near-miss T junctions
//!              ─▶ ③ snap_and_bridge        endpoint merge + gap connectors
//!              ─▶ ④ build_network          vertices, source/target, degrees
//!              ─▶ ⑤ merge_chains           degree-2 contraction (optional)
//!              ─▶ ⑥ analyze_connectivity   components, isolation, smoke routes
//! ```
//!
//! Every stage rewrites the staging store under one transaction and is a
//! pure function of its input plus the configuration — no wall-clock
//! inputs, deterministic iteration orders throughout.  Invariants are
//! checked before each graph commit; a violation rolls the stage back and
//! aborts the run.  Cancellation is honored between stages; soft deadlines
//! produce partial commits.
//!
//! # Crate layout
//!
//! | Module         | Contents                                            |
//! |----------------|-----------------------------------------------------|
//! | [`runner`]     | `PipelineBuilder`, `Pipeline`, `RunSummary`         |
//! | [`loops`]      | Loop decomposition stage                            |
//! | [`split`]      | Intersection splitter (passes A and B)              |
//! | [`snap`]       | Endpoint snapper / gap filler                       |
//! | [`invariants`] | Cross-model checks run before graph commits         |
//! | [`persist`]    | Graph → store-row conversion                        |
//! | [`stage`]      | `StageCtx` (config + deadline + report)             |
//! | [`observer`]   | `PipelineObserver`, `NoopObserver`                  |
//! | [`error`]      | `PipelineError`, `PipelineResult`                   |

pub mod error;
pub mod invariants;
pub mod loops;
pub mod observer;
pub mod persist;
pub mod runner;
pub mod snap;
pub mod split;
pub mod stage;

#[cfg(test)]
mod tests;

pub use error::{PipelineError, PipelineResult};
pub use observer::{NoopObserver, PipelineObserver};
pub use runner::{Pipeline, PipelineBuilder, RunSummary};
