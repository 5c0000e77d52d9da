//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Malware-analysis tool orchestrator
///
/// Runs the static and dynamic analysis tools enabled in an analysis
/// configuration against one target binary, then writes JSON, Markdown
/// and HTML reports of what each tool produced.
#[derive(Parser, Debug)]
#[command(name = "overseer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Analysis configuration file (JSON or TOML)
    #[arg(short, long, env = "OVERSEER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an analysis and write reports
    Run(RunArgs),

    /// Show what a run would launch without launching anything
    Plan(PlanArgs),

    /// Show where each known tool resolves on this host
    Tools(ToolsArgs),

    /// Re-render reports from a saved JSON result
    Report(ReportArgs),

    /// Open a report or the reports directory
    Open(OpenArgs),

    /// Manage CLI settings
    Settings(SettingsArgs),
}

// ============================================================================
// Run command
// ============================================================================

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Report formats to write (json, markdown, html)
    #[arg(short, long, value_delimiter = ',')]
    pub report: Vec<String>,

    /// Open the reports directory when the run finishes
    #[arg(long)]
    pub open: bool,

    /// Static tools allowed to run at once
    #[arg(short = 'j', long)]
    pub max_parallel: Option<usize>,

    /// Do not execute the target even if the configuration asks for it
    #[arg(long)]
    pub no_execute: bool,
}

// ============================================================================
// Plan command
// ============================================================================

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Only list invocations that will be launched
    #[arg(long)]
    pub active: bool,
}

// ============================================================================
// Tools command
// ============================================================================

#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Only look up this tool
    #[arg(short, long)]
    pub tool: Option<String>,

    /// Custom executable path to try first (requires --tool)
    #[arg(short, long, requires = "tool")]
    pub path: Option<PathBuf>,

    /// Only list tools that could not be found
    #[arg(long)]
    pub missing: bool,
}

// ============================================================================
// Report command
// ============================================================================

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// JSON result written by a previous run
    pub result: PathBuf,

    /// Report formats to write (json, markdown, html)
    #[arg(short, long, value_delimiter = ',')]
    pub format: Vec<String>,

    /// Directory to write into (defaults to the result's directory)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,
}

// ============================================================================
// Open command
// ============================================================================

#[derive(Args, Debug)]
pub struct OpenArgs {
    /// Report file or directory (defaults to the configured reports directory)
    pub path: Option<PathBuf>,
}

// ============================================================================
// Settings command
// ============================================================================

#[derive(Args, Debug)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommands,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Show current settings
    Show,

    /// Set a settings value
    Set {
        /// Settings key
        key: String,

        /// Value to set
        value: String,
    },

    /// Show settings file path
    Path,
}
