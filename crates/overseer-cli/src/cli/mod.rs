//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "OVERSEER_LOG";

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);
    if cli.no_color {
        colored::control::set_override(false);
    }

    let settings = Settings::load()?;
    let output_format = cli
        .output
        .or(settings.output_format)
        .unwrap_or_default();

    let ctx = commands::Context {
        output_format,
        verbose: cli.verbose,
        no_color: cli.no_color,
        config: cli.config,
        settings,
    };

    match cli.command {
        Commands::Run(args) => commands::run::execute(ctx, args).await,
        Commands::Plan(args) => commands::plan::execute(ctx, args).await,
        Commands::Tools(args) => commands::tools::execute(ctx, args).await,
        Commands::Report(args) => commands::report::execute(ctx, args).await,
        Commands::Open(args) => commands::open::execute(ctx, args).await,
        Commands::Settings(args) => commands::settings::execute(ctx, args).await,
    }
}

/// Install the log subscriber. `-v` forces debug output.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
