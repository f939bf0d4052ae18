//! Pipeline observer trait for progress reporting.

use tn_core::{RunDiagnostics, StageKind, StageReport};

/// Callbacks invoked by [`Pipeline::run`][crate::Pipeline::run] at stage
/// boundaries.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
///
/// # Example — progress printer
///
/// ```rust,ignore
/// struct ProgressPrinter;
///
/// impl PipelineObserver for ProgressPrinter {
///     fn on_stage_end(&mut self, stage: StageKind, report: &StageReport) {
///         println!("{stage}: {} in, {} out", report.inputs, report.outputs);
///     }
/// }
/// ```
pub trait PipelineObserver {
    /// Called just before a stage body starts.
    fn on_stage_start(&mut self, _stage: StageKind) {}

    /// Called after a stage commits, with its final report.
    fn on_stage_end(&mut self, _stage: StageKind, _report: &StageReport) {}

    /// Called once with the assembled diagnostics, whether the run
    /// succeeded or is about to propagate a fatal error.
    fn on_run_end(&mut self, _diagnostics: &RunDiagnostics) {}
}

/// A [`PipelineObserver`] that does nothing.
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}
