//! Pipeline run configuration.
//!
//! Every tolerance the stages consult lives here and is threaded explicitly
//! into each stage — no stage re-reads global state.  The CLI's `--set
//! key=val` flag maps onto [`PipelineConfig::apply_override`].

use std::time::Duration;

use crate::diag::StageKind;
use crate::error::{CoreError, CoreResult};

/// Hard lower bound for gap bridging, metres.  Endpoint pairs closer than
/// this are coincident and are merged rather than bridged.
pub const BRIDGE_FLOOR_M: f64 = 1.0;

/// Candidate split points closer than this collapse into one, metres.
pub const POINT_MERGE_TOL_M: f64 = 0.01;

/// All tolerances and switches for one pipeline run.
///
/// The defaults mirror the canonical values: snapping at `1e-6` degrees,
/// T-intersection capture at 3 m, gap bridging up to 10 m.
#[derive(Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct PipelineConfig {
    /// Vertex snap tolerance for exact-intersection detection, degrees.
    pub snap_tol_degrees: f64,

    /// Buffer radius for the point-split fallback, degrees.
    pub split_buffer_degrees: f64,

    /// Near-miss T-intersection detection radius, metres.
    pub t_intersection_tol_m: f64,

    /// Endpoint coincidence radius, metres.  Values above
    /// [`BRIDGE_FLOOR_M`] widen the merge band.
    pub vertex_merge_tol_m: f64,

    /// Maximum straight-connector length, metres.
    pub gap_tolerance_m: f64,

    /// Split pieces shorter than this are discarded, metres.
    pub min_segment_m: f64,

    /// Allowed per-edge length loss across a split, metres.
    pub length_tolerance_m: f64,

    /// Coordinate rounding applied before snapping and vertex extraction.
    pub round_decimals: u32,

    /// Densification interval for loop decomposition, metres.
    pub densify_interval_m: f64,

    /// Enable degree-2 chain contraction.
    pub merge_degree2: bool,

    /// Soft deadline for the intersection splitter, seconds.
    pub split_stage_timeout_s: u64,

    /// Soft deadline for every other stage, seconds.
    pub stage_timeout_s: u64,

    /// Number of shortest-path smoke samples in the connectivity report.
    pub sample_paths: usize,

    /// Seed for the deterministic sample-path RNG.
    pub seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            snap_tol_degrees:      1e-6,
            split_buffer_degrees:  1e-6,
            t_intersection_tol_m:  3.0,
            vertex_merge_tol_m:    0.1,
            gap_tolerance_m:       10.0,
            min_segment_m:         1.0,
            length_tolerance_m:    1.0,
            round_decimals:        6,
            densify_interval_m:    5.0,
            merge_degree2:         true,
            split_stage_timeout_s: 600,
            stage_timeout_s:       300,
            sample_paths:          5,
            seed:                  42,
        }
    }
}

impl PipelineConfig {
    /// Soft deadline budget for `stage`.
    pub fn timeout_for(&self, stage: StageKind) -> Duration {
        let secs = match stage {
            StageKind::SplitIntersections => self.split_stage_timeout_s,
            _                             => self.stage_timeout_s,
        };
        Duration::from_secs(secs)
    }

    /// The merge radius actually used by the endpoint snapper: the
    /// configured tolerance, but never below the bridging floor.
    #[inline]
    pub fn merge_radius_m(&self) -> f64 {
        self.vertex_merge_tol_m.max(BRIDGE_FLOOR_M)
    }

    /// Apply one `key=val` override, as received from the CLI `--set` flag.
    ///
    /// Unknown keys and unparsable values are configuration errors.
    pub fn apply_override(&mut self, kv: &str) -> CoreResult<()> {
        let (key, val) = kv
            .split_once('=')
            .ok_or_else(|| CoreError::Config(format!("expected key=val, got {kv:?}")))?;

        fn parse<T: std::str::FromStr>(key: &str, val: &str) -> CoreResult<T> {
            val.trim().parse().map_err(|_| {
                CoreError::Config(format!("invalid value {val:?} for {key}"))
            })
        }

        match key.trim() {
            "snap_tol_degrees"      => self.snap_tol_degrees = parse(key, val)?,
            "split_buffer_degrees"  => self.split_buffer_degrees = parse(key, val)?,
            "t_intersection_tol_m"  => self.t_intersection_tol_m = parse(key, val)?,
            "vertex_merge_tol_m"    => self.vertex_merge_tol_m = parse(key, val)?,
            "gap_tolerance_m"       => self.gap_tolerance_m = parse(key, val)?,
            "min_segment_m"         => self.min_segment_m = parse(key, val)?,
            "length_tolerance_m"    => self.length_tolerance_m = parse(key, val)?,
            "round_decimals"        => self.round_decimals = parse(key, val)?,
            "densify_interval_m"    => self.densify_interval_m = parse(key, val)?,
            "merge_degree2"         => self.merge_degree2 = parse(key, val)?,
            "split_stage_timeout_s" => self.split_stage_timeout_s = parse(key, val)?,
            "stage_timeout_s"       => self.stage_timeout_s = parse(key, val)?,
            "sample_paths"          => self.sample_paths = parse(key, val)?,
            "seed"                  => self.seed = parse(key, val)?,
            other => {
                return Err(CoreError::Config(format!("unknown configuration key {other:?}")));
            }
        }
        self.validate()
    }

    /// Reject configurations no stage can honor.
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.snap_tol_degrees > 0.0 && self.snap_tol_degrees.is_finite()) {
            return Err(CoreError::Config("snap_tol_degrees must be positive".into()));
        }
        if !(self.split_buffer_degrees > 0.0 && self.split_buffer_degrees.is_finite()) {
            return Err(CoreError::Config("split_buffer_degrees must be positive".into()));
        }
        if self.t_intersection_tol_m < 0.0 || self.gap_tolerance_m < 0.0 {
            return Err(CoreError::Config("tolerances must be non-negative".into()));
        }
        if self.min_segment_m <= 0.0 {
            return Err(CoreError::Config("min_segment_m must be positive".into()));
        }
        if self.round_decimals == 0 || self.round_decimals > 12 {
            return Err(CoreError::Config("round_decimals must be in 1..=12".into()));
        }
        Ok(())
    }
}
