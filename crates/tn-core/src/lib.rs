//! `tn-core` — foundational types for the trailnet trail-to-graph pipeline.
//!
//! This crate is a dependency of every other `tn-*` crate.  It intentionally
//! has no `tn-*` dependencies and minimal external ones (`rand`, `serde`,
//! `thiserror`).
//!
//! # What lives here
//!
//! | Module     | Contents                                                  |
//! |------------|-----------------------------------------------------------|
//! | [`ids`]    | `VertexId`, `EdgeId`                                      |
//! | [`geo`]    | `GeoPoint3`, haversine distance, rounding, `BBox`         |
//! | [`line`]   | `Line3` polyline + derived scalars                        |
//! | [`trail`]  | `Trail` record, `TrailUuid` identity scheme               |
//! | [`config`] | `PipelineConfig` tolerances + `--set` overrides           |
//! | [`diag`]   | `StageKind`, `StageReport`, `ConnectivityReport`          |
//! | [`cancel`] | `CancelToken`, `StageDeadline`                            |
//! | [`rng`]    | `RunRng` (seeded, deterministic)                          |
//! | [`error`]  | `CoreError`, `CoreResult`                                 |

pub mod cancel;
pub mod config;
pub mod diag;
pub mod error;
pub mod geo;
pub mod ids;
pub mod line;
pub mod rng;
pub mod trail;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use cancel::{CancelToken, StageDeadline};
pub use config::{PipelineConfig, BRIDGE_FLOOR_M, POINT_MERGE_TOL_M};
pub use diag::{ConnectivityReport, RunDiagnostics, SamplePath, SkipRecord, StageKind, StageReport};
pub use error::{CoreError, CoreResult};
pub use geo::{BBox, GeoPoint3};
pub use ids::{EdgeId, VertexId};
pub use line::Line3;
pub use rng::RunRng;
pub use trail::{Trail, TrailUuid};
