//! `tn-store` — the per-run staging workspace.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                   |
//! |------------|------------------------------------------------------------|
//! | [`store`]  | `StagingStore`: trails/edges/vertices/diagnostics tables   |
//! | [`rows`]   | `EdgeRow`, `VertexRow`, the polyline text codec            |
//! | [`import`] | CSV raw-trail-source adapter with region/bbox filters      |
//! | [`error`]  | `StoreError`, `StoreResult`                                |
//!
//! # Guarantees
//!
//! - Every mutation runs inside one SQLite transaction; a failed write
//!   leaves the store unchanged.
//! - Stagings are isolated by name (one database per name).
//! - `teardown` removes all traces and is idempotent.

pub mod error;
pub mod import;
pub mod rows;
pub mod store;


pub use error::{StoreError, StoreResult};
pub use import::{import_trails_csv, import_trails_reader, ImportFilter, ImportSummary};
pub use rows::{decode_line2, decode_line3, encode_line2, encode_line3, EdgeRow, VertexRow};
pub use store::StagingStore;
