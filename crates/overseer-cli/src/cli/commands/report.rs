//! `overseer report` - Re-render reports from a saved JSON result.

use anyhow::{Context as _, Result};
use colored::Colorize;

use overseer_report::{load_result, ReportGenerator};

use super::Context;
use crate::cli::args::ReportArgs;
use crate::config::{expand, parse_formats};
use crate::output::{print_csv, print_structured, OutputFormat};

pub async fn execute(ctx: Context, args: ReportArgs) -> Result<()> {
    let formats = if args.format.is_empty() {
        ctx.settings.report_formats.clone()
    } else {
        parse_formats(args.format.iter().map(String::as_str))?
    };

    let source = expand(&args.result);
    let result = load_result(&source).with_context(|| format!("loading result {}", source.display()))?;

    let dir = match &args.dir {
        Some(dir) => expand(dir),
        None => source
            .parent()
            .map(std::path::Path::to_path_buf)
            .unwrap_or_default(),
    };
    let reports = ReportGenerator::new(dir).render_many(&result, &formats)?;

    if print_structured(ctx.output_format, &reports)? {
        return Ok(());
    }

    match ctx.output_format {
        OutputFormat::Csv => {
            let rows: Vec<_> = reports.iter().map(|p| [p.display().to_string()]).collect();
            print_csv(&rows)?;
        }
        _ => {
            println!(
                "{} {} ({})",
                "Binary:".bold(),
                result.binary.name.cyan().bold(),
                result.status
            );
            for path in &reports {
                println!("  {} {}", "Wrote".green(), path.display());
            }
        }
    }

    Ok(())
}
