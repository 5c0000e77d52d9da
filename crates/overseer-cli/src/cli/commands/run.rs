//! `overseer run` - Run an analysis and write reports.

use anyhow::Result;
use chrono::Local;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use overseer_core::AnalysisResult;
use overseer_engine::{build_plan, Orchestrator, Resolver, StatusEvent};
use overseer_report::ReportGenerator;

use super::Context;
use crate::cli::args::RunArgs;
use crate::config::parse_formats;
use crate::output::{analysis_status_colored, print_csv, print_structured, print_table, OutcomeRow, OutputFormat};

#[derive(Serialize)]
struct RunSummary<'a> {
    result: &'a AnalysisResult,
    reports: &'a [PathBuf],
}

pub async fn execute(ctx: Context, args: RunArgs) -> Result<()> {
    // Reject bad formats before anything is launched
    let formats = if args.report.is_empty() {
        ctx.settings.report_formats.clone()
    } else {
        parse_formats(args.report.iter().map(String::as_str))?
    };

    let mut config = ctx.load_config()?;
    if args.no_execute {
        config.binary.run = false;
    }

    let plan = build_plan(&config, &Resolver::from_env());
    debug!(invocations = plan.len(), "run plan built");

    let mut options = ctx.settings.orchestrator_options();
    if let Some(n) = args.max_parallel {
        options.max_parallel = n.max(1);
    }

    let orchestrator = Orchestrator::new(options);
    let progress = spawn_progress(orchestrator.subscribe(), ctx.output_format == OutputFormat::Pretty);

    let stop = orchestrator.stop_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping analysis");
            stop.request_stop();
        }
    });

    let outcome = orchestrator.run(&plan, &config.paths).await;

    interrupt.abort();
    let _ = interrupt.await;
    drop(orchestrator);
    let _ = progress.await;

    let result = outcome?;

    let generator = ReportGenerator::new(config.paths.reports());
    let reports = generator.render_many(&result, &formats)?;

    if !print_structured(ctx.output_format, &RunSummary {
        result: &result,
        reports: &reports,
    })? {
        if ctx.output_format == OutputFormat::Csv {
            print_csv(&OutcomeRow::all(&result, false))?;
        } else {
            print_summary(&ctx, &result, &reports);
        }
    }

    if args.open {
        ::open::that(generator.reports_dir())?;
    }

    Ok(())
}

fn print_summary(ctx: &Context, result: &AnalysisResult, reports: &[PathBuf]) {
    println!("{} {}", "Binary:".bold(), result.binary.name.cyan().bold());
    println!("  {} {}", "SHA-256:".bold(), result.binary.sha256.dimmed());
    println!("  {} {}", "Status:".bold(), analysis_status_colored(result.status));
    let finished = result.finished_at.with_timezone(&Local);
    let elapsed = (result.finished_at - result.started_at).num_seconds();
    println!(
        "  {} {} ({elapsed}s)",
        "Finished:".bold(),
        finished.format("%Y-%m-%d %H:%M:%S")
    );
    println!();

    let rows = OutcomeRow::all(result, ctx.color());
    if rows.is_empty() {
        println!("{}", "No tools were enabled.".dimmed());
    } else {
        print_table(&rows);
    }

    for s in &result.suppressions {
        println!("{} {}", "Note:".yellow().bold(), s.reason);
    }

    if !reports.is_empty() {
        println!();
        println!("{}", "Reports:".bold());
        for path in reports {
            println!("  {}", path.display());
        }
    }
}

fn spawn_progress(mut events: broadcast::Receiver<StatusEvent>, show: bool) -> JoinHandle<()> {
    tokio::spawn(async move {
        let spinner = show.then(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        });

        loop {
            match events.recv().await {
                Ok(event) => {
                    debug!(%event, "status");
                    if let Some(pb) = &spinner {
                        match &event {
                            StatusEvent::Finished { .. } | StatusEvent::Skipped { .. } | StatusEvent::StopRequested => {
                                pb.println(format!("  {event}"));
                            }
                            _ => pb.set_message(event.to_string()),
                        }
                    }
                    if matches!(event, StatusEvent::Completed { .. }) {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => debug!(missed, "status events dropped"),
                Err(RecvError::Closed) => break,
            }
        }

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
    })
}
