//! Pipeline error taxonomy.
//!
//! Only run-ending conditions live here.  The recoverable classes —
//! invalid geometry, degenerate splits — are `tn_geom::GeomError` values
//! that the stages catch at every call site and turn into skip
//! diagnostics; by construction they never escape a stage body, so this
//! enum has no variant for them.  Deadline expiry is not an error either:
//! the stage commits partial progress and its report carries the
//! `partial` flag.

use thiserror::Error;

use tn_core::{CoreError, StageKind};
use tn_store::StoreError;

/// Fatal errors from a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),

    /// A post-stage check failed.  The stage's write was rolled back.
    #[error("invariant violated after {stage}: {detail}")]
    InvariantViolated { stage: StageKind, detail: String },

    /// Network construction yielded zero edges.
    #[error("graph has no edges")]
    EmptyGraph,

    /// The cancel token fired at a stage boundary.
    #[error("run cancelled before {stage}")]
    Cancelled { stage: StageKind },

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl From<CoreError> for PipelineError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Config(msg) => PipelineError::Config(msg),
            CoreError::Parse(msg) => PipelineError::Config(msg),
            CoreError::Io(io) => PipelineError::Storage(StoreError::Io(io)),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
