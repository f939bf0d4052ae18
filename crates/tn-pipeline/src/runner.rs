//! The stage runner.
//!
//! Stages execute strictly in sequence — decompose loops, split
//! intersections, snap and bridge, build the network, merge chains, analyze
//! connectivity — each reading the staging store's state and rewriting it
//! under one transaction.  Cancellation is honored at stage boundaries;
//! soft deadlines inside stage worklists lead to partial commits, never
//! aborts.  Diagnostics are assembled throughout and appended to the store
//! even when a fatal error is about to propagate.

use tn_core::{
    CancelToken, PipelineConfig, RunDiagnostics, RunRng, StageKind, StageReport, Trail,
};
use tn_graph::{analyze, build_graph, merge_degree2_chains, GraphError, TrailGraph};
use tn_store::StagingStore;

use crate::error::{PipelineError, PipelineResult};
use crate::invariants;
use crate::loops::decompose_loops;
use crate::observer::PipelineObserver;
use crate::persist::graph_to_rows;
use crate::snap::snap_and_bridge;
use crate::split::split_intersections;
use crate::stage::StageCtx;

// ── Builder ───────────────────────────────────────────────────────────────────

/// Fluent builder for a [`Pipeline`].
///
/// # Example
///
/// ```rust,ignore
/// let store = StagingStore::open(data_dir, "boulder_2024")?;
/// let mut pipeline = PipelineBuilder::new(config, store)
///     .cancel_token(token)
///     .build()?;
/// let summary = pipeline.run(&mut NoopObserver)?;
/// ```
pub struct PipelineBuilder {
    config: PipelineConfig,
    store:  StagingStore,
    cancel: CancelToken,
}

impl PipelineBuilder {
    pub fn new(config: PipelineConfig, store: StagingStore) -> Self {
        Self { config, store, cancel: CancelToken::new() }
    }

    /// Install a cancellation token checked at every stage boundary.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Validate the configuration and produce a ready-to-run pipeline.
    pub fn build(self) -> PipelineResult<Pipeline> {
        self.config.validate()?;
        Ok(Pipeline { config: self.config, store: self.store, cancel: self.cancel })
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// What a completed run hands back.
#[derive(Debug)]
pub struct RunSummary {
    pub diagnostics: RunDiagnostics,
    /// `true` when any stage hit its soft deadline and committed early.
    pub partial: bool,
}

/// One configured run over one staging store.
pub struct Pipeline {
    config: PipelineConfig,
    store:  StagingStore,
    cancel: CancelToken,
}

impl Pipeline {
    pub fn store(&self) -> &StagingStore {
        &self.store
    }

    /// Hand the store back (e.g. for teardown by the caller).
    pub fn into_store(self) -> StagingStore {
        self.store
    }

    /// Execute the full stage sequence.
    pub fn run<O: PipelineObserver>(&mut self, observer: &mut O) -> PipelineResult<RunSummary> {
        let mut diag = RunDiagnostics::new(self.store.name());
        let result = self.run_stages(observer, &mut diag);

        // Capture diagnostics before propagation so a failed run is
        // debuggable from the store alone.  Best effort: if storage itself
        // is the problem, the original error matters more.
        if let Ok(payload) = serde_json::to_string(&diag) {
            let _ = self.store.append_diagnostics("run", &payload);
        }
        observer.on_run_end(&diag);

        result.map(|partial| RunSummary { diagnostics: diag, partial })
    }

    /// Re-run network construction (build → merge → analyze) from the
    /// current trails table, without touching the geometry stages.  Given
    /// the same trails and configuration this reproduces the same graph.
    pub fn rebuild_graph<O: PipelineObserver>(
        &mut self,
        observer: &mut O,
    ) -> PipelineResult<RunSummary> {
        let mut diag = RunDiagnostics::new(self.store.name());
        let trails = self.store.load_trails()?;
        let result = self.graph_stages(&trails, observer, &mut diag);

        if let Ok(payload) = serde_json::to_string(&diag) {
            let _ = self.store.append_diagnostics("rebuild", &payload);
        }
        observer.on_run_end(&diag);

        result.map(|partial| RunSummary { diagnostics: diag, partial })
    }

    // ── Stage sequencing ──────────────────────────────────────────────────

    fn run_stages<O: PipelineObserver>(
        &mut self,
        observer: &mut O,
        diag: &mut RunDiagnostics,
    ) -> PipelineResult<bool> {
        let mut partial = false;

        // ── Geometry stages: each rewrites the trails table ───────────────
        let mut trails = self.store.load_trails()?;
        for (stage, body) in [
            (StageKind::DecomposeLoops, decompose_loops as StageFn),
            (StageKind::SplitIntersections, split_intersections as StageFn),
            (StageKind::SnapAndBridge, snap_and_bridge as StageFn),
        ] {
            self.guard(stage)?;
            observer.on_stage_start(stage);
            let mut ctx = StageCtx::new(stage, &self.config);

            trails = body(trails, &mut ctx);
            self.store.replace_trails(&trails)?;

            let report = ctx.finish();
            log_stage(stage, &report);
            partial |= report.partial;
            observer.on_stage_end(stage, &report);
            diag.stages.push((stage, report));
        }

        // ── Graph stages ──────────────────────────────────────────────────
        //
        // Re-read the trails through the store so network construction sees
        // exactly what was persisted (the geometry codec rounds to 7
        // decimals); `rebuild_graph` then reproduces the same graph.
        let trails = self.store.load_trails()?;
        partial |= self.graph_stages(&trails, observer, diag)?;
        Ok(partial)
    }

    /// Build → merge → analyze, persisting edges/vertices after each
    /// mutating stage.  Shared by `run` and `rebuild_graph`.
    fn graph_stages<O: PipelineObserver>(
        &mut self,
        trails: &[Trail],
        observer: &mut O,
        diag: &mut RunDiagnostics,
    ) -> PipelineResult<bool> {
        let mut partial = false;

        // ── Build network (C6) ────────────────────────────────────────────
        self.guard(StageKind::BuildNetwork)?;
        observer.on_stage_start(StageKind::BuildNetwork);
        let mut ctx = StageCtx::new(StageKind::BuildNetwork, &self.config);
        ctx.report.inputs = trails.len() as u64;

        let (mut graph, outcome) =
            build_graph(trails, self.config.round_decimals).map_err(|e| match e {
                GraphError::EmptyGraph => PipelineError::EmptyGraph,
                GraphError::Inconsistent(detail) => PipelineError::InvariantViolated {
                    stage: StageKind::BuildNetwork,
                    detail,
                },
            })?;
        for uuid in &outcome.rejected_loops {
            ctx.report.discarded += 1;
            ctx.report
                .skip(uuid.clone(), "edge_rejected_loop", "endpoints collapse to one vertex");
        }
        ctx.report.outputs = graph.edge_count() as u64;

        // Length preservation: rejected trails never became edges, so they
        // sit outside the comparison.
        let before_km: f64 = trails
            .iter()
            .filter(|t| !outcome.rejected_loops.contains(&t.uuid.as_str().to_owned()))
            .map(|t| t.length_km)
            .sum();
        commit_graph(&self.config, &mut self.store, StageKind::BuildNetwork, &graph, before_km)?;

        let report = ctx.finish();
        log_stage(StageKind::BuildNetwork, &report);
        observer.on_stage_end(StageKind::BuildNetwork, &report);
        diag.stages.push((StageKind::BuildNetwork, report));

        // ── Merge chains (C7) ─────────────────────────────────────────────
        self.guard(StageKind::MergeChains)?;
        observer.on_stage_start(StageKind::MergeChains);
        let mut ctx = StageCtx::new(StageKind::MergeChains, &self.config);
        ctx.report.inputs = graph.edge_count() as u64;

        if self.config.merge_degree2 {
            let before_km = graph.total_length_km();
            let merge = merge_degree2_chains(&mut graph);
            ctx.report.merges = merge.contracted;
            ctx.report.outputs = graph.edge_count() as u64;
            commit_graph(&self.config, &mut self.store, StageKind::MergeChains, &graph, before_km)?;
        } else {
            ctx.report.outputs = ctx.report.inputs;
            ctx.report
                .skip("merge_degree2", "disabled_by_config", "chain merging skipped");
        }

        let report = ctx.finish();
        log_stage(StageKind::MergeChains, &report);
        partial |= report.partial;
        observer.on_stage_end(StageKind::MergeChains, &report);
        diag.stages.push((StageKind::MergeChains, report));

        // ── Analyze connectivity (C8) ─────────────────────────────────────
        self.guard(StageKind::AnalyzeConnectivity)?;
        observer.on_stage_start(StageKind::AnalyzeConnectivity);
        let mut ctx = StageCtx::new(StageKind::AnalyzeConnectivity, &self.config);
        ctx.report.inputs = graph.edge_count() as u64;

        let mut rng = RunRng::new(self.config.seed);
        let connectivity = analyze(&graph, self.config.sample_paths, &mut rng);
        ctx.report.outputs = connectivity.component_sizes.len() as u64;
        diag.connectivity = Some(connectivity);

        let report = ctx.finish();
        log_stage(StageKind::AnalyzeConnectivity, &report);
        observer.on_stage_end(StageKind::AnalyzeConnectivity, &report);
        diag.stages.push((StageKind::AnalyzeConnectivity, report));

        Ok(partial)
    }

    fn guard(&self, stage: StageKind) -> PipelineResult<()> {
        if self.cancel.is_cancelled() {
            log::warn!("run cancelled before {stage}");
            return Err(PipelineError::Cancelled { stage });
        }
        Ok(())
    }
}

type StageFn = fn(Vec<Trail>, &mut StageCtx<'_>) -> Vec<Trail>;

/// Invariant-check the graph, then persist it.  Check failures skip the
/// write entirely, leaving the staging in its pre-stage state.  A free
/// function so the caller can keep its stage context (which borrows the
/// config) alive across the commit.
fn commit_graph(
    config: &PipelineConfig,
    store: &mut StagingStore,
    stage: StageKind,
    graph: &TrailGraph,
    before_km: f64,
) -> PipelineResult<()> {
    invariants::check_graph(graph, config)
        .and_then(|()| {
            invariants::check_length_preserved(
                before_km,
                graph.total_length_km(),
                graph.edge_count(),
                config,
            )
        })
        .map_err(|detail| PipelineError::InvariantViolated { stage, detail })?;

    let (edges, vertices) = graph_to_rows(graph);
    store.replace_graph(&edges, &vertices)?;
    Ok(())
}

fn log_stage(stage: StageKind, report: &StageReport) {
    log::info!(
        "{stage}: {} in → {} out ({} splits, {} merges, {} bridges, {} skips{}) in {} ms",
        report.inputs,
        report.outputs,
        report.splits,
        report.merges,
        report.bridges,
        report.skips.len(),
        if report.partial { ", PARTIAL" } else { "" },
        report.elapsed_ms
    );
}
