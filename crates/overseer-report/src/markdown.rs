use std::fmt::Write;

use overseer_core::{AnalysisResult, ToolOutcome, ToolPayload};

use crate::{duration_label, exit_label, yes_no};

/// Render a result as a Markdown document.
pub fn render(result: &AnalysisResult) -> String {
    let mut md = String::new();
    let binary = &result.binary;

    let _ = writeln!(md, "# Malware Analysis Report\n");
    let _ = writeln!(md, "## Summary\n");
    let _ = writeln!(md, "- **Binary:** {}", binary.name);
    let _ = writeln!(md, "- **Status:** {}", result.status);
    let _ = writeln!(md, "- **SHA-256:** `{}`", binary.sha256);
    let _ = writeln!(md, "- **Size:** {} bytes", binary.size_bytes);
    let _ = writeln!(md, "- **Binary Path:** `{}`", binary.original_path.display());
    let _ = writeln!(md, "- **Staged Path:** `{}`", binary.staged_path.display());
    let _ = writeln!(md, "- **Executed:** {}", yes_no(binary.run));
    let _ = writeln!(md, "- **Run as Admin:** {}", yes_no(binary.as_admin));
    let _ = writeln!(md, "- **Archive Password:** {}", yes_no(binary.has_archive_password));
    let _ = writeln!(md, "- **Started:** {}", result.started_at.to_rfc3339());
    let _ = writeln!(md, "- **Finished:** {}", result.finished_at.to_rfc3339());

    if !result.suppressions.is_empty() || !result.skipped.is_empty() {
        let _ = writeln!(md, "\n## Not Run\n");
        for s in &result.suppressions {
            let _ = writeln!(md, "- **{}**: {}", s.tool, s.reason);
        }
        for s in &result.skipped {
            let _ = writeln!(md, "- **{}**: skipped ({})", s.tool, s.reason);
        }
    }

    section(&mut md, "Static Analysis Results", &result.static_results);
    section(&mut md, "Dynamic Analysis Results", &result.dynamic_results);

    let _ = writeln!(md, "\n## Procmon Results\n");
    match &result.procmon {
        Some(procmon) => {
            let duration = if procmon.timer_disabled {
                "until stopped".to_string()
            } else {
                format!("{} s", procmon.duration_secs)
            };
            let _ = writeln!(md, "- **Capture window:** {duration}");
            tool(&mut md, &procmon.outcome);
        }
        None => {
            let _ = writeln!(md, "No Procmon data available");
        }
    }

    md
}

fn section(md: &mut String, title: &str, outcomes: &[ToolOutcome]) {
    let _ = writeln!(md, "\n## {title}\n");
    if outcomes.is_empty() {
        let _ = writeln!(md, "No results available");
        return;
    }

    let _ = writeln!(md, "| Tool | Status | Exit | Duration |");
    let _ = writeln!(md, "|------|--------|------|----------|");
    for o in outcomes {
        let _ = writeln!(
            md,
            "| {} | {} | {} | {} |",
            o.tool,
            o.status,
            exit_label(o),
            duration_label(o)
        );
    }
    for o in outcomes {
        tool(md, o);
    }
}

fn tool(md: &mut String, outcome: &ToolOutcome) {
    let _ = writeln!(md, "\n### {}\n", outcome.tool);
    if let Some(executable) = &outcome.executable {
        let _ = writeln!(md, "- **Executable:** {}", code_span(&executable.to_string_lossy()));
        if !outcome.args.is_empty() {
            let _ = writeln!(md, "- **Arguments:** {}", code_span(&outcome.args.join(" ")));
        }
        let _ = writeln!(md);
    }
    if let Some(reason) = outcome.stop_reason {
        let _ = writeln!(md, "_Stopped: {reason}_\n");
    }
    if let Some(error) = &outcome.error {
        let _ = writeln!(md, "**Error:** {error}\n");
    }

    match &outcome.payload {
        ToolPayload::Json { data } => {
            let pretty = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
            fenced(md, "json", &pretty);
        }
        ToolPayload::Text { text, truncated } => {
            fenced(md, "text", text);
            if *truncated {
                let _ = writeln!(md, "_Output truncated._");
            }
        }
        ToolPayload::Artifact { path, size_bytes } => {
            let _ = writeln!(md, "Artifact: `{}` ({size_bytes} bytes)", path.display());
        }
        ToolPayload::Empty => {
            let _ = writeln!(md, "_No output._");
        }
    }

    if let Some(stderr) = &outcome.stderr {
        let _ = writeln!(md, "\n<details><summary>stderr</summary>\n");
        fenced(md, "text", stderr);
        let _ = writeln!(md, "</details>");
    }
}

/// Fence long enough that the content cannot close it.
fn fenced(md: &mut String, lang: &str, content: &str) {
    let longest = content
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest.max(2) + 1);
    let _ = writeln!(md, "{fence}{lang}\n{}\n{fence}", content.trim_end_matches('\n'));
}

/// Inline code whose delimiter outgrows any backtick run in `content`.
fn code_span(content: &str) -> String {
    let longest = content
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let ticks = "`".repeat(longest + 1);
    if longest == 0 {
        format!("{ticks}{content}{ticks}")
    } else {
        format!("{ticks} {content} {ticks}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fence_outgrows_content() {
        let mut md = String::new();
        fenced(&mut md, "text", "a ```` b");
        assert!(md.starts_with("`````text\n"));
        assert!(md.ends_with("\n`````\n"));
    }

    #[test]
    fn test_code_span_survives_backticks() {
        assert_eq!(code_span("-j /b/sample.exe"), "`-j /b/sample.exe`");
        assert_eq!(code_span("a `b` c"), "`` a `b` c ``");
    }

    #[test]
    fn test_plain_fence() {
        let mut md = String::new();
        fenced(&mut md, "json", "{}\n");
        assert_eq!(md, "```json\n{}\n```\n");
    }
}
