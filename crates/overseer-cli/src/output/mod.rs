//! Output formatting for different formats.

use anyhow::Result;
use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tabled::{settings::Style, Table, Tabled};

use overseer_core::{AnalysisResult, AnalysisStatus, InvocationStatus, ToolOutcome};

/// Available output formats.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed tables with colors
    #[default]
    Pretty,
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// YAML output
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "table" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => anyhow::bail!(
                "Unknown output format: {s}\n\
                 Valid formats: pretty, json, csv, yaml"
            ),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

/// Print a value as JSON or YAML. Returns false for table formats.
pub fn print_structured<T: Serialize + ?Sized>(format: OutputFormat, value: &T) -> Result<bool> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        OutputFormat::Pretty | OutputFormat::Csv => return Ok(false),
    }
    Ok(true)
}

/// Write rows as CSV to stdout, with a header from the row's field names.
pub fn print_csv<T: Serialize>(rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(std::io::stdout());
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Print rows as a rounded table.
pub fn print_table<T: Tabled>(rows: &[T]) {
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

/// One tool outcome flattened for tables and CSV.
#[derive(Debug, Serialize, Tabled)]
pub struct OutcomeRow {
    #[tabled(rename = "Tool")]
    pub tool: String,
    #[tabled(rename = "Category")]
    pub category: String,
    #[tabled(rename = "Stage")]
    pub stage: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Exit")]
    pub exit: String,
    #[tabled(rename = "Duration")]
    pub duration: String,
    #[tabled(rename = "Note")]
    pub note: String,
}

impl OutcomeRow {
    /// Flatten an outcome; `color` styles the status cell.
    pub fn new(outcome: &ToolOutcome, color: bool) -> Self {
        let status = if color {
            status_colored(outcome.status).to_string()
        } else {
            outcome.status.to_string()
        };
        let note = outcome
            .error
            .clone()
            .or_else(|| outcome.stop_reason.map(|r| format!("stopped: {r}")))
            .or_else(|| outcome.skip_reason.map(|r| format!("skipped: {r}")))
            .unwrap_or_default();

        Self {
            tool: outcome.tool.clone(),
            category: outcome.category.to_string(),
            stage: outcome.stage.to_string(),
            status,
            exit: outcome.exit_code.map(|c| c.to_string()).unwrap_or_default(),
            duration: outcome
                .duration_ms
                .map(|ms| format!("{:.1}s", std::time::Duration::from_millis(ms).as_secs_f64()))
                .unwrap_or_default(),
            note,
        }
    }

    /// Every outcome of a result, procmon last.
    pub fn all(result: &AnalysisResult, color: bool) -> Vec<Self> {
        result.outcomes().map(|o| Self::new(o, color)).collect()
    }
}

/// Invocation status with a color matching its severity.
pub fn status_colored(status: InvocationStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        InvocationStatus::Succeeded => label.green(),
        InvocationStatus::Failed | InvocationStatus::TimedOut => label.red(),
        InvocationStatus::Killed => label.yellow(),
        InvocationStatus::Skipped => label.dimmed(),
        InvocationStatus::Pending | InvocationStatus::Launched | InvocationStatus::Running => label.cyan(),
    }
}

/// Overall verdict with a color matching its severity.
pub fn analysis_status_colored(status: AnalysisStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        AnalysisStatus::Complete => label.green().bold(),
        AnalysisStatus::Partial => label.yellow().bold(),
        AnalysisStatus::Failed => label.red().bold(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overseer_core::{SkipReason, ToolCategory, ToolStage};

    #[test]
    fn test_parse_aliases() {
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Pretty);
        assert_eq!("YML".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_outcome_row_notes() {
        let skipped = ToolOutcome::skipped("Floss", ToolCategory::Static, ToolStage::Static, SkipReason::ToolNotFound);
        let row = OutcomeRow::new(&skipped, false);
        assert_eq!(row.status, "skipped");
        assert_eq!(row.note, "skipped: tool-not-found");
        assert_eq!(row.exit, "");

        let mut failed = skipped;
        failed.status = InvocationStatus::Failed;
        failed.exit_code = Some(2);
        failed.duration_ms = Some(2500);
        failed.error = Some("Floss failed (exit code 2)".into());
        let row = OutcomeRow::new(&failed, false);
        assert_eq!(row.exit, "2");
        assert_eq!(row.duration, "2.5s");
        assert_eq!(row.note, "Floss failed (exit code 2)");
    }
}
