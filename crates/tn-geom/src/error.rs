//! Geometry-kernel error type.

use thiserror::Error;

/// Errors produced by `tn-geom`.
///
/// Both variants are recoverable at the call site by design: the pipeline
/// skips the offending pair or declines the split and records a diagnostic.
#[derive(Debug, Error)]
pub enum GeomError {
    /// Empty, zero-length, or non-finite input.  Callers are expected to
    /// filter with [`validate`][crate::kernel::validate] before the heavier
    /// operations; this is the backstop.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A point split would produce a zero-length or sub-minimum piece.
    #[error("degenerate split: {0}")]
    DegenerateSplit(String),
}

pub type GeomResult<T> = Result<T, GeomError>;
