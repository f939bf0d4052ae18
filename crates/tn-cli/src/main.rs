//! `trailnet` — thin CLI over the trail-to-graph pipeline.
//!
//! Exit codes: 0 success (including partial stages), 2 configuration
//! error, 3 input unavailable or empty, 4 invariant violation or storage
//! failure (diagnostics dumped to stderr first).

mod cli;

use std::process::ExitCode;

use clap::Parser;

use tn_core::{BBox, PipelineConfig, StageKind, StageReport};
use tn_pipeline::{Pipeline, PipelineBuilder, PipelineError, PipelineObserver};
use tn_store::{import_trails_csv, ImportFilter, StagingStore, StoreError};

use cli::Cli;

const EXIT_CONFIG: u8 = 2;
const EXIT_INPUT: u8 = 3;
const EXIT_FAILED: u8 = 4;

fn main() -> ExitCode {
    let args = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        match args.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        },
    ))
    .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err((code, message)) => {
            eprintln!("error: {message}");
            ExitCode::from(code)
        }
    }
}

fn run(args: &Cli) -> Result<(), (u8, String)> {
    // ── Configuration ─────────────────────────────────────────────────────
    let mut config = PipelineConfig::default();
    for kv in &args.overrides {
        config
            .apply_override(kv)
            .map_err(|e| (EXIT_CONFIG, e.to_string()))?;
    }
    let bbox = args
        .bbox
        .as_deref()
        .map(parse_bbox)
        .transpose()
        .map_err(|e| (EXIT_CONFIG, e))?;

    // ── Staging store ─────────────────────────────────────────────────────
    let mut store = if args.in_memory {
        StagingStore::open_in_memory(&args.staging)
    } else {
        StagingStore::open(&args.data_dir, &args.staging)
    }
    .map_err(|e| match e {
        StoreError::InvalidName(_) => (EXIT_CONFIG, e.to_string()),
        other => (EXIT_FAILED, other.to_string()),
    })?;

    // ── Import ────────────────────────────────────────────────────────────
    if let Some(input) = &args.input {
        if !input.exists() {
            return Err((EXIT_INPUT, format!("input file {} not found", input.display())));
        }
        let filter = ImportFilter { region: args.region.clone(), bbox };
        let summary = import_trails_csv(input, &mut store, &filter)
            .map_err(|e| (EXIT_INPUT, e.to_string()))?;
        println!(
            "imported {} of {} trails ({} invalid, {} filtered)",
            summary.imported, summary.read, summary.skipped_invalid, summary.skipped_filtered
        );
    }

    // ── Run ───────────────────────────────────────────────────────────────
    let mut pipeline = PipelineBuilder::new(config, store)
        .build()
        .map_err(|e| (EXIT_CONFIG, e.to_string()))?;

    let result = pipeline.run(&mut StagePrinter);
    match result {
        Ok(summary) => {
            print_summary(&summary.diagnostics.connectivity, summary.partial);
            finish(pipeline, args.teardown)
        }
        Err(e) => {
            let code = match &e {
                PipelineError::Config(_) => EXIT_CONFIG,
                PipelineError::EmptyGraph => EXIT_INPUT,
                _ => EXIT_FAILED,
            };
            if code == EXIT_FAILED {
                dump_diagnostics(&pipeline);
            }
            Err((code, e.to_string()))
        }
    }
}

/// Keep or remove the staging workspace after a successful run.
fn finish(pipeline: Pipeline, teardown: bool) -> Result<(), (u8, String)> {
    if teardown {
        pipeline
            .into_store()
            .teardown()
            .map_err(|e| (EXIT_FAILED, e.to_string()))?;
    }
    Ok(())
}

/// Best-effort dump of the persisted run diagnostics on a fatal error.
fn dump_diagnostics(pipeline: &Pipeline) {
    if let Ok(Some(payload)) = pipeline.store().last_diagnostic("run") {
        eprintln!("diagnostics: {payload}");
    }
}

// ── Output formatting ─────────────────────────────────────────────────────────

/// Prints one line per completed stage.
struct StagePrinter;

impl PipelineObserver for StagePrinter {
    fn on_stage_end(&mut self, stage: StageKind, report: &StageReport) {
        println!(
            "{stage:>22}: {:>6} in {:>6} out  splits {:<5} merges {:<5} bridges {:<5} skips {}{}",
            report.inputs,
            report.outputs,
            report.splits,
            report.merges,
            report.bridges,
            report.skips.len(),
            if report.partial { "  [partial]" } else { "" },
        );
    }
}

fn print_summary(connectivity: &Option<tn_core::ConnectivityReport>, partial: bool) {
    let Some(report) = connectivity else { return };
    println!();
    println!(
        "components: {} (largest {} vertices), connectivity score {:.3}",
        report.component_sizes.len(),
        report.component_sizes.first().copied().unwrap_or(0),
        report.connectivity_score,
    );
    println!(
        "isolated vertices: {}, dangling edges: {}, isolated edges: {}",
        report.isolated_vertices, report.dangling_edges, report.isolated_edges,
    );
    for path in &report.sample_paths {
        println!(
            "  sample route {} → {}: {} edges, {:.2} km",
            path.from.0, path.to.0, path.hops, path.length_km
        );
    }
    if partial {
        println!("note: one or more stages hit their soft deadline (partial results)");
    }
}

/// Parse `minLng,minLat,maxLng,maxLat`.
fn parse_bbox(s: &str) -> Result<BBox, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("invalid bbox {s:?}: expected four numbers"))?;
    if parts.len() != 4 {
        return Err(format!("invalid bbox {s:?}: expected four numbers, got {}", parts.len()));
    }
    let bbox = BBox {
        min_lng: parts[0],
        min_lat: parts[1],
        max_lng: parts[2],
        max_lat: parts[3],
    };
    if bbox.min_lng >= bbox.max_lng || bbox.min_lat >= bbox.max_lat {
        return Err(format!("invalid bbox {s:?}: min must be below max"));
    }
    Ok(bbox)
}
