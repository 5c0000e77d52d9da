//! `overseer tools` - Show where each known tool resolves.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use overseer_core::{descriptor, ToolDescriptor, CATALOG};
use overseer_engine::{discover_all, Resolution, Resolver};

use super::Context;
use crate::cli::args::ToolsArgs;
use crate::config::expand;
use crate::output::{print_csv, print_structured, print_table, OutputFormat};

#[derive(Serialize, Tabled)]
struct ToolRow {
    #[tabled(rename = "Tool")]
    tool: &'static str,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Stage")]
    stage: String,
    #[tabled(rename = "Found")]
    found: bool,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Found Via")]
    source: String,
}

impl ToolRow {
    fn new(descriptor: &'static ToolDescriptor, resolution: &Resolution) -> Self {
        let (path, source) = match resolution {
            Resolution::Found(resolved) => (resolved.path.display().to_string(), resolved.source.to_string()),
            Resolution::NotFound {
                rejected_custom: Some(rejected),
                ..
            } => (format!("{} (does not exist)", rejected.display()), String::new()),
            Resolution::NotFound { .. } => (String::new(), String::new()),
        };

        Self {
            tool: descriptor.name,
            category: descriptor.category.to_string(),
            stage: descriptor.stage.to_string(),
            found: resolution.is_found(),
            path,
            source,
        }
    }
}

pub async fn execute(ctx: Context, args: ToolsArgs) -> Result<()> {
    let resolver = Resolver::from_env();

    // Custom paths from an explicitly given configuration
    let config = match &ctx.config {
        Some(_) => Some(ctx.load_config()?),
        None => None,
    };

    let resolutions = match (&args.tool, &config) {
        (None, None) => discover_all(&resolver),
        (tool, config) => {
            let descriptors: Vec<&'static ToolDescriptor> = match tool {
                Some(name) => vec![lookup(name)?],
                None => CATALOG.iter().collect(),
            };
            descriptors
                .into_iter()
                .map(|d| {
                    let custom = args
                        .path
                        .as_deref()
                        .map(expand)
                        .or_else(|| config.as_ref().and_then(|c| c.tool_path(d.name)).map(expand));
                    (d, resolver.resolve(d, custom.as_deref()))
                })
                .collect()
        }
    };

    let rows: Vec<ToolRow> = resolutions
        .iter()
        .map(|(d, resolution)| ToolRow::new(*d, resolution))
        .filter(|row| !args.missing || !row.found)
        .collect();

    if print_structured(ctx.output_format, &rows)? {
        return Ok(());
    }

    match ctx.output_format {
        OutputFormat::Csv => print_csv(&rows)?,
        _ => {
            if rows.is_empty() {
                println!("{}", "Every tool was found.".green());
                return Ok(());
            }
            print_table(&rows);
            let found = rows.iter().filter(|r| r.found).count();
            println!();
            println!(
                "{} of {} tools found on {}.",
                found.to_string().cyan().bold(),
                rows.len(),
                resolver.context().os
            );
        }
    }

    Ok(())
}

fn lookup(name: &str) -> Result<&'static ToolDescriptor> {
    descriptor(name).ok_or_else(|| {
        let known: Vec<&str> = CATALOG.iter().map(|d| d.name).collect();
        anyhow::anyhow!("Unknown tool: {name}\n\nKnown tools: {}", known.join(", "))
    })
}
