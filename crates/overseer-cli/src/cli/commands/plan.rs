//! `overseer plan` - Show what a run would launch.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use overseer_core::{PlannedInvocation, RunPlan};
use overseer_engine::{build_plan, Resolver};

use super::Context;
use crate::cli::args::PlanArgs;
use crate::output::{print_csv, print_structured, print_table, OutputFormat};

#[derive(Serialize, Tabled)]
struct PlanRow {
    #[tabled(rename = "Tool")]
    tool: String,
    #[tabled(rename = "Stage")]
    stage: String,
    #[tabled(rename = "Executable")]
    executable: String,
    #[tabled(rename = "Found Via")]
    source: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Arguments")]
    args: String,
}

impl PlanRow {
    fn new(invocation: &PlannedInvocation) -> Self {
        Self {
            tool: invocation.tool.clone(),
            stage: invocation.stage.to_string(),
            executable: invocation
                .executable
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            source: invocation.source.map(|s| s.to_string()).unwrap_or_default(),
            state: invocation
                .skip
                .map_or_else(|| "ready".to_string(), |r| format!("skip: {r}")),
            args: invocation.args.join(" "),
        }
    }
}

pub async fn execute(ctx: Context, args: PlanArgs) -> Result<()> {
    let config = ctx.load_config()?;
    let plan = build_plan(&config, &Resolver::from_env());

    let rows: Vec<PlanRow> = if args.active {
        plan.active().map(PlanRow::new).collect()
    } else {
        plan.invocations().map(PlanRow::new).collect()
    };

    if print_structured(ctx.output_format, &plan)? {
        return Ok(());
    }

    match ctx.output_format {
        OutputFormat::Csv => print_csv(&rows)?,
        _ => print_plan_pretty(&plan, &rows),
    }

    Ok(())
}

fn print_plan_pretty(plan: &RunPlan, rows: &[PlanRow]) {
    let target = &plan.target;
    println!("{} {}", "Target:".bold(), target.name().cyan().bold());
    println!("  {} {}", "Source:".bold(), target.source.display());
    println!("  {} {}", "Staged as:".bold(), target.staged.display());
    println!("  {} {}", "Execute:".bold(), if target.run { "yes" } else { "no" });
    if target.run {
        println!("  {} {}", "Elevated:".bold(), if target.as_admin { "yes" } else { "no" });
    }
    println!();

    if rows.is_empty() {
        println!("{}", "No tools enabled.".dimmed());
    } else {
        print_table(rows);
    }

    for s in &plan.suppressions {
        println!("{} {}", "Note:".yellow().bold(), s.reason);
    }
    for invocation in plan.invocations() {
        for note in &invocation.notes {
            println!("{} {}: {note}", "Note:".yellow().bold(), invocation.tool);
        }
    }

    let active = plan.active().count();
    println!();
    println!(
        "{} of {} invocations will launch.",
        active.to_string().cyan().bold(),
        plan.len()
    );
}
