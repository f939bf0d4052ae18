//! Graph-subsystem error type.

use thiserror::Error;

/// Errors produced by `tn-graph`.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Network construction yielded zero edges.  Fatal for the run.
    #[error("graph has no edges")]
    EmptyGraph,

    /// A structural self-check failed (degree counts, endpoint wiring).
    /// The pipeline treats this as an invariant violation and rolls back.
    #[error("graph inconsistency: {0}")]
    Inconsistent(String),
}

pub type GraphResult<T> = Result<T, GraphError>;
