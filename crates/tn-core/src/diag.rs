//! Diagnostics rows produced by every run.
//!
//! Plain data — assembled by the pipeline runner, serialized to JSON, and
//! appended to the staging store's `diagnostics` table.  Nothing in here
//! aborts a run; fatal errors carry their own types.

use crate::ids::VertexId;

// ── Stage identity ────────────────────────────────────────────────────────────

/// The six pipeline stages, in execution order.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    DecomposeLoops,
    SplitIntersections,
    SnapAndBridge,
    BuildNetwork,
    MergeChains,
    AnalyzeConnectivity,
}

impl StageKind {
    /// Execution order.
    pub const ALL: [StageKind; 6] = [
        StageKind::DecomposeLoops,
        StageKind::SplitIntersections,
        StageKind::SnapAndBridge,
        StageKind::BuildNetwork,
        StageKind::MergeChains,
        StageKind::AnalyzeConnectivity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::DecomposeLoops      => "decompose_loops",
            StageKind::SplitIntersections  => "split_intersections",
            StageKind::SnapAndBridge       => "snap_and_bridge",
            StageKind::BuildNetwork        => "build_network",
            StageKind::MergeChains         => "merge_chains",
            StageKind::AnalyzeConnectivity => "analyze_connectivity",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Per-stage report ──────────────────────────────────────────────────────────

/// One locally-recovered skip: a pair, trail, or split that was declined.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SkipRecord {
    /// What was skipped — trail uuid, `"a×b"` pair, or edge id.
    pub subject: String,
    /// Machine-readable reason (`"overlap_skipped"`, `"degenerate_split"`,
    /// `"invalid_geometry"`, `"gap_unbridged"`, `"edge_rejected_loop"`, …).
    pub reason:  String,
    /// Free-form detail for humans.
    pub detail:  String,
}

/// Counters and skips for one stage execution.
#[derive(Clone, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct StageReport {
    pub inputs:     u64,
    pub outputs:    u64,
    pub splits:     u64,
    pub merges:     u64,
    pub bridges:    u64,
    pub discarded:  u64,
    pub skips:      Vec<SkipRecord>,
    /// `true` when the stage hit its soft deadline and committed early.
    pub partial:    bool,
    pub elapsed_ms: u64,
}

impl StageReport {
    pub fn skip(&mut self, subject: impl Into<String>, reason: &str, detail: impl Into<String>) {
        self.skips.push(SkipRecord {
            subject: subject.into(),
            reason:  reason.to_owned(),
            detail:  detail.into(),
        });
    }
}

// ── Connectivity report ───────────────────────────────────────────────────────

/// One shortest-path smoke sample inside the largest component.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SamplePath {
    pub from:      VertexId,
    pub to:        VertexId,
    pub hops:      usize,
    pub length_km: f64,
}

/// The connectivity analyzer's output.  Reported, never acted on.
#[derive(Clone, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ConnectivityReport {
    /// Component sizes in vertices, largest first.
    pub component_sizes:    Vec<usize>,
    pub isolated_vertices:  u64,
    /// Edges with at least one degree-1 endpoint.
    pub dangling_edges:     u64,
    /// Edges with both endpoints at degree 1.
    pub isolated_edges:     u64,
    /// `largest component size / total vertices`; 0 for an empty graph.
    pub connectivity_score: f64,
    pub sample_paths:       Vec<SamplePath>,
}

// ── Run-level assembly ────────────────────────────────────────────────────────

/// Everything a run reports, in stage order.
#[derive(Clone, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct RunDiagnostics {
    pub staging:      String,
    pub stages:       Vec<(StageKind, StageReport)>,
    pub connectivity: Option<ConnectivityReport>,
}

impl RunDiagnostics {
    pub fn new(staging: impl Into<String>) -> Self {
        RunDiagnostics { staging: staging.into(), ..Default::default() }
    }

    pub fn report_for(&self, stage: StageKind) -> Option<&StageReport> {
        self.stages.iter().find(|(s, _)| *s == stage).map(|(_, r)| r)
    }
}
