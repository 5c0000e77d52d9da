//! Report rendering for overseer analysis results.
//!
//! Renders an [`AnalysisResult`] as JSON (full fidelity), Markdown or HTML.
//! Artifacts are written to `<reports_dir>/<binary>_<YYYYmmdd_HHMMSS>.<ext>`,
//! timestamped from the result's finish time. Writes go through a temporary
//! file in the same directory, so a failed render leaves nothing behind.

#![doc(html_root_url = "https://docs.rs/overseer-report/0.3.0")]

mod error;
mod format;
mod html;
mod markdown;

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

use overseer_core::{AnalysisResult, ToolOutcome};

pub use error::{ReportError, ReportResult};
pub use format::ReportFormat;

/// Writes report artifacts into one directory
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    reports_dir: PathBuf,
}

impl ReportGenerator {
    /// Create a generator writing into `reports_dir`
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }

    /// Directory artifacts are written to
    #[must_use]
    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Path an artifact for this result and format would be written to.
    #[must_use]
    pub fn report_path(&self, result: &AnalysisResult, format: ReportFormat) -> PathBuf {
        let timestamp = result.finished_at.format("%Y%m%d_%H%M%S");
        self.reports_dir.join(format!(
            "{}_{timestamp}.{}",
            result.binary.name,
            format.extension()
        ))
    }

    /// Render one format and write it, returning the artifact path.
    pub fn render(&self, result: &AnalysisResult, format: ReportFormat) -> ReportResult<PathBuf> {
        let content = render_to_string(result, format)?;
        let path = self.report_path(result, format);

        std::fs::create_dir_all(&self.reports_dir)?;
        let mut tmp = NamedTempFile::new_in(&self.reports_dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| ReportError::Persist {
            path: path.clone(),
            source: e.error,
        })?;

        info!(path = %path.display(), %format, "report written");
        Ok(path)
    }

    /// Render a format given by name.
    ///
    /// # Errors
    ///
    /// Unknown names fail with [`ReportError::UnsupportedFormat`] before
    /// anything is written.
    pub fn render_str(&self, result: &AnalysisResult, format: &str) -> ReportResult<PathBuf> {
        let format: ReportFormat = format.parse()?;
        self.render(result, format)
    }

    /// Render several formats in one call, in the order given.
    pub fn render_many(&self, result: &AnalysisResult, formats: &[ReportFormat]) -> ReportResult<Vec<PathBuf>> {
        let mut seen = Vec::with_capacity(formats.len());
        for format in formats {
            if !seen.contains(format) {
                seen.push(*format);
            }
        }
        seen.into_iter().map(|f| self.render(result, f)).collect()
    }
}

/// Render a result in memory.
pub fn render_to_string(result: &AnalysisResult, format: ReportFormat) -> ReportResult<String> {
    Ok(match format {
        ReportFormat::Json => serde_json::to_string_pretty(result)?,
        ReportFormat::Markdown => markdown::render(result),
        ReportFormat::Html => html::render(result),
    })
}

/// Load a result previously written as a JSON report.
pub fn load_result(path: &Path) -> ReportResult<AnalysisResult> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn exit_label(outcome: &ToolOutcome) -> String {
    outcome
        .exit_code
        .map_or_else(|| "-".to_string(), |c| c.to_string())
}

const fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn duration_label(outcome: &ToolOutcome) -> String {
    match outcome.duration_ms {
        Some(ms) if ms >= 1000 => format!("{:.1} s", std::time::Duration::from_millis(ms).as_secs_f64()),
        Some(ms) => format!("{ms} ms"),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use overseer_core::{
        AnalysisStatus, BinaryMetadata, InvocationStatus, ProcmonReport, SkipReason, SkipRecord, StopReason,
        Suppression, ToolCategory, ToolPayload, ToolStage,
    };
    use tempfile::TempDir;

    fn outcome(tool: &str, payload: ToolPayload) -> ToolOutcome {
        let mut o = ToolOutcome::skipped(tool, ToolCategory::Static, ToolStage::Static, SkipReason::ToolNotFound);
        o.status = InvocationStatus::Succeeded;
        o.skip_reason = None;
        o.exit_code = Some(0);
        o.duration_ms = Some(1500);
        o.payload = payload;
        o
    }

    fn sample() -> AnalysisResult {
        let finished_at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        let mut procmon = outcome("Procmon", ToolPayload::Artifact {
            path: PathBuf::from("/a/procmon/procmon.pml"),
            size_bytes: 4096,
        });
        procmon.category = ToolCategory::Dynamic;
        procmon.stage = ToolStage::Monitor;
        procmon.status = InvocationStatus::Killed;
        procmon.stop_reason = Some(StopReason::BudgetElapsed);
        let mut capa = outcome("Capa", ToolPayload::Json {
            data: serde_json::json!({"rules": {"packed": true}}),
        });
        capa.executable = Some(PathBuf::from("/t/capa/capa.exe"));
        capa.args = vec!["-j".into(), "/b/sample.exe".into()];

        AnalysisResult {
            binary: BinaryMetadata {
                name: "sample.exe".into(),
                original_path: PathBuf::from("/in/sample.exe"),
                staged_path: PathBuf::from("/b/sample.exe"),
                size_bytes: 11,
                sha256: "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9".into(),
                run: true,
                as_admin: false,
                has_archive_password: true,
            },
            status: AnalysisStatus::Complete,
            started_at: finished_at - chrono::Duration::seconds(90),
            finished_at,
            static_results: vec![
                capa,
                outcome("Yara", ToolPayload::Text {
                    text: "<script>alert(1)</script>".into(),
                    truncated: false,
                }),
            ],
            dynamic_results: Vec::new(),
            procmon: Some(ProcmonReport {
                duration_secs: 60,
                timer_disabled: false,
                outcome: procmon,
            }),
            suppressions: vec![Suppression {
                tool: "TTD".into(),
                reason: "TTD suppressed: Process Monitor selected".into(),
            }],
            skipped: vec![SkipRecord {
                tool: "Floss".into(),
                reason: SkipReason::ToolNotFound,
            }],
        }
    }

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        match std::fs::read_dir(dir) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    #[test]
    fn test_report_path_uses_finish_time() {
        let generator = ReportGenerator::new("/a/reports");
        assert_eq!(
            generator.report_path(&sample(), ReportFormat::Markdown),
            PathBuf::from("/a/reports/sample.exe_20260314_092653.md")
        );
    }

    #[test]
    fn test_json_is_full_fidelity() {
        let dir = TempDir::new().unwrap();
        let generator = ReportGenerator::new(dir.path());
        let result = sample();

        let path = generator.render(&result, ReportFormat::Json).unwrap();
        assert_eq!(load_result(&path).unwrap(), result);
    }

    #[test]
    fn test_render_does_not_mutate() {
        let dir = TempDir::new().unwrap();
        let result = sample();
        let before = result.clone();
        ReportGenerator::new(dir.path())
            .render_many(&result, &ReportFormat::ALL)
            .unwrap();
        assert_eq!(result, before);
    }

    #[test]
    fn test_render_many() {
        let dir = TempDir::new().unwrap();
        let paths = ReportGenerator::new(dir.path().join("reports"))
            .render_many(&sample(), &[ReportFormat::Html, ReportFormat::Json, ReportFormat::Html])
            .unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].extension().is_some_and(|e| e == "html"));
        assert!(paths[1].extension().is_some_and(|e| e == "json"));
        assert_eq!(files_in(&dir.path().join("reports")).len(), 2);
    }

    #[test]
    fn test_unsupported_format_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let reports = dir.path().join("reports");
        let err = ReportGenerator::new(&reports)
            .render_str(&sample(), "pdf")
            .unwrap_err();

        assert!(matches!(&err, ReportError::UnsupportedFormat(v) if v == "pdf"));
        assert!(files_in(&reports).is_empty());

        let core: overseer_core::OverseerError = err.into();
        assert!(matches!(core, overseer_core::OverseerError::UnsupportedFormat(v) if v == "pdf"));
    }

    #[test]
    fn test_markdown_content() {
        let md = render_to_string(&sample(), ReportFormat::Markdown).unwrap();
        assert!(md.starts_with("# Malware Analysis Report"));
        assert!(md.contains("- **Status:** complete"));
        assert!(md.contains("| Capa | succeeded | 0 | 1.5 s |"));
        assert!(md.contains("\"packed\": true"));
        assert!(md.contains("- **TTD**: TTD suppressed: Process Monitor selected"));
        assert!(md.contains("- **Floss**: skipped (tool-not-found)"));
        assert!(md.contains("_Stopped: budget-elapsed_"));
        assert!(md.contains("Artifact: `/a/procmon/procmon.pml` (4096 bytes)"));
        assert!(md.contains("No results available"));
        assert!(md.contains("- **Staged Path:** `/b/sample.exe`"));
        assert!(md.contains("- **Executed:** yes"));
        assert!(md.contains("- **Run as Admin:** no"));
        assert!(md.contains("- **Archive Password:** yes"));
        assert!(md.contains("- **Executable:** `/t/capa/capa.exe`"));
        assert!(md.contains("- **Arguments:** `-j /b/sample.exe`"));
    }

    #[test]
    fn test_html_escapes_tool_output() {
        let html = render_to_string(&sample(), ReportFormat::Html).unwrap();
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("<title>Malware Analysis Report - sample.exe</title>"));
        assert!(html.contains("class=\"complete\""));
    }

    #[test]
    fn test_html_lists_target_and_invocation_details() {
        let html = render_to_string(&sample(), ReportFormat::Html).unwrap();
        assert!(html.contains("<strong>Staged Path:</strong> /b/sample.exe"));
        assert!(html.contains("<strong>Executed:</strong> yes"));
        assert!(html.contains("<strong>Run as Admin:</strong> no"));
        assert!(html.contains("<strong>Archive Password:</strong> yes"));
        assert!(html.contains("<strong>Executable:</strong> <code>/t/capa/capa.exe</code>"));
        assert!(html.contains("<strong>Arguments:</strong> <code>-j /b/sample.exe</code>"));
    }
}
