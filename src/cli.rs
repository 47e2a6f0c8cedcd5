use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "panos-acc")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Acceptance tests for declarative PAN-OS / Panorama entries", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run acceptance scenarios
    Run(RunArgs),

    /// List built-in scenarios
    List,

    /// List supported object kinds, or show one kind's schema
    Kinds {
        /// Kind to describe (e.g. address, ethernet_layer3_subinterface)
        kind: Option<String>,
    },

    /// Show what a scenario step would change
    Plan(PlanArgs),

    /// Delete leftover test entries from a device
    Sweep(SweepArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Run
// ============================================================================

#[derive(Args)]
pub struct RunArgs {
    /// Built-in or discovered scenario names (default: all built-ins)
    pub names: Vec<String>,

    /// Scenario file to run (repeatable)
    #[arg(short, long = "file")]
    pub files: Vec<PathBuf>,

    /// Directory searched recursively for *.toml scenarios
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Number of parallel cases
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Use the in-memory store instead of a device
    #[arg(long)]
    pub offline: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Write the run report as JSON to a file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

// ============================================================================
// Plan
// ============================================================================

#[derive(Args)]
pub struct PlanArgs {
    /// Built-in scenario name
    #[arg(conflicts_with = "file", required_unless_present = "file")]
    pub name: Option<String>,

    /// Scenario file
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Step to preview, starting at 1
    #[arg(short, long, default_value = "1")]
    pub step: usize,

    /// Use the in-memory store instead of a device
    #[arg(long)]
    pub offline: bool,
}

// ============================================================================
// Sweep
// ============================================================================

#[derive(Args)]
pub struct SweepArgs {
    /// Object kind (e.g. address)
    #[arg(short, long)]
    pub kind: String,

    /// Location: shared, panorama, device-group:NAME, template:NAME[/VSYS] or vsys:NAME
    #[arg(short, long)]
    pub location: String,

    /// Name prefix of the entries to delete
    #[arg(short, long, default_value = "test-acc-")]
    pub prefix: String,

    /// Only list what would be deleted
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt (test prefixes only)
    #[arg(short, long)]
    pub yes: bool,
}
