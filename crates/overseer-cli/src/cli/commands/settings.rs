//! `overseer settings` - CLI settings management.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::cli::args::{SettingsArgs, SettingsCommands};
use crate::config::Settings;
use crate::output::print_structured;

pub async fn execute(ctx: Context, args: SettingsArgs) -> Result<()> {
    match args.command {
        SettingsCommands::Show => show_settings(&ctx),
        SettingsCommands::Set { key, value } => set_setting(&key, &value),
        SettingsCommands::Path => show_path(),
    }
}

fn show_settings(ctx: &Context) -> Result<()> {
    let settings = Settings::load()?;

    if print_structured(ctx.output_format, &settings)? {
        return Ok(());
    }

    println!("{}", "Current Settings:".bold());
    println!();

    let config = settings
        .config_path
        .as_ref()
        .map_or_else(|| "(not set)".dimmed().to_string(), |p| p.display().to_string());
    println!("  {} {}", "config_path:".bold(), config);
    println!(
        "  {} {}",
        "output_format:".bold(),
        settings.output_format.unwrap_or_default()
    );
    let formats: Vec<String> = settings.report_formats.iter().map(ToString::to_string).collect();
    println!("  {} {}", "report_formats:".bold(), formats.join(","));
    println!("  {} {}", "max_parallel:".bold(), settings.max_parallel);
    println!("  {} {}", "static_ceiling_secs:".bold(), settings.static_ceiling_secs);
    println!("  {} {}", "dynamic_ceiling_secs:".bold(), settings.dynamic_ceiling_secs);
    let elevation = if settings.elevation_command.is_empty() {
        "(not set)".dimmed().to_string()
    } else {
        settings.elevation_command.join(" ")
    };
    println!("  {} {}", "elevation_command:".bold(), elevation);

    Ok(())
}

fn set_setting(key: &str, value: &str) -> Result<()> {
    let mut settings = Settings::load()?;
    settings.set(key, value)?;
    settings.save()?;
    println!("{} {} set to {}.", "Success:".green().bold(), key, value.cyan());
    Ok(())
}

fn show_path() -> Result<()> {
    println!("{}", Settings::path()?.display());
    Ok(())
}
