// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: One flat command: bootstrap by default, teardown with --destroy, dry run with --plan.

use clap::Parser;
use layerboot::types::LayerSelector;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "layerboot")]
#[command(about = "Layered bootstrap and teardown of customer environments")]
#[command(version)]
pub struct Cli {
    /// Customer profile to act on (<profiles_dir>/<customer>.yml)
    #[arg(long)]
    pub customer: String,

    /// Restrict the run to a single layer
    #[arg(long, default_value = "All")]
    pub layer: LayerSelector,

    /// Apply layers even when their probe reports them satisfied
    #[arg(long, conflicts_with = "plan")]
    pub force: bool,

    /// Tear the customer environment down in reverse layer order
    #[arg(long, conflicts_with = "plan")]
    pub destroy: bool,

    /// Run preflight and probes only and show what a bootstrap would do
    #[arg(long)]
    pub plan: bool,

    /// Path to the orchestrator config (default: discover layerboot.yml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Break an existing run lock for this customer
    #[arg(long)]
    pub break_lock: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long)]
    pub json: bool,
}
