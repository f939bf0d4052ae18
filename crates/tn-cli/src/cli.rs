//! Argument schema for the `trailnet` binary.

use std::path::PathBuf;

/// Build a routable trail network from a regional trail dataset.
///
/// Imports trails (when `--input` is given), runs the trail-to-graph
/// pipeline against the named staging workspace, and prints the
/// connectivity report.  The staging tables (`trails`, `edges`,
/// `vertices`, `diagnostics`) are the output — they are kept for
/// downstream consumers unless `--teardown` is passed.
#[derive(clap::Parser, Debug)]
#[command(name = "trailnet", version, about, propagate_version = true)]
pub struct Cli {
    /// Staging workspace name (one SQLite database per name)
    #[arg(long)]
    pub staging: String,

    /// Trail CSV to import before running (omit to reuse staged trails)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub input: Option<PathBuf>,

    /// Keep only trails whose region attribute matches
    #[arg(long)]
    pub region: Option<String>,

    /// Keep only trails intersecting minLng,minLat,maxLng,maxLat
    #[arg(long, value_name = "MINLNG,MINLAT,MAXLNG,MAXLAT")]
    pub bbox: Option<String>,

    /// Directory holding the staging databases
    #[arg(long, default_value = "trailnet-data", value_hint = clap::ValueHint::DirPath)]
    pub data_dir: PathBuf,

    /// Configuration override, repeatable (e.g. --set gap_tolerance_m=15)
    #[arg(long = "set", value_name = "KEY=VAL")]
    pub overrides: Vec<String>,

    /// Use a transient in-memory staging store (smoke runs)
    #[arg(long)]
    pub in_memory: bool,

    /// Remove the staging workspace after the run
    #[arg(long)]
    pub teardown: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
