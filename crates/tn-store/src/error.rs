//! Staging-store error type.

use thiserror::Error;

/// Errors produced by `tn-store`.  Everything here is fatal to the run —
/// the pipeline maps these to its `Storage` class and aborts with rollback.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid staging name {0:?}: use [A-Za-z0-9_-] only")]
    InvalidName(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
