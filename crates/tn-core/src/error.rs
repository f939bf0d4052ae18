//! Core error type.
//!
//! Sub-crates define their own error enums (`GeomError`, `StoreError`,
//! `GraphError`) and convert into the pipeline's top-level error via `From`
//! impls.  `CoreError` covers only what this crate itself can fail at.

use thiserror::Error;

/// Errors produced by `tn-core`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for `tn-core`.
pub type CoreResult<T> = Result<T, CoreError>;
