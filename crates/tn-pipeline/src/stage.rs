//! Per-stage execution context.

use tn_core::{PipelineConfig, StageDeadline, StageKind, StageReport};

/// Everything a stage body needs: the run configuration, its soft deadline,
/// and the report it fills in.  Constructed fresh by the runner for every
/// stage; stages never see each other's context.
pub struct StageCtx<'a> {
    pub stage:    StageKind,
    pub config:   &'a PipelineConfig,
    pub deadline: StageDeadline,
    pub report:   StageReport,
}

impl<'a> StageCtx<'a> {
    pub fn new(stage: StageKind, config: &'a PipelineConfig) -> Self {
        Self {
            stage,
            config,
            deadline: StageDeadline::start(config.timeout_for(stage)),
            report: StageReport::default(),
        }
    }

    /// Check the soft deadline.  The first expired check marks the report
    /// partial; stages break out of their worklists on `true` and commit
    /// what they have.
    pub fn out_of_time(&mut self) -> bool {
        if self.deadline.expired() {
            if !self.report.partial {
                log::warn!("{} hit its soft deadline; committing partial progress", self.stage);
                self.report.partial = true;
            }
            true
        } else {
            false
        }
    }

    /// Close the report with the elapsed wall time.
    pub fn finish(mut self) -> StageReport {
        self.report.elapsed_ms = self.deadline.elapsed_ms();
        self.report
    }
}
