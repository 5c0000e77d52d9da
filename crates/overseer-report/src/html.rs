use html_escape::encode_text;
use std::fmt::Write;

use overseer_core::{AnalysisResult, AnalysisStatus, ToolOutcome, ToolPayload};

use crate::{duration_label, exit_label, yes_no};

const STYLE: &str = "
        body { font-family: Arial, sans-serif; margin: 20px; }
        h1 { color: #333; }
        h2 { color: #666; border-bottom: 2px solid #ddd; padding-bottom: 5px; }
        .section { margin: 20px 0; }
        .tool-result { background: #f5f5f5; padding: 10px; margin: 10px 0; border-radius: 5px; }
        .summary { background: #e8f4f8; padding: 15px; border-left: 4px solid #2196F3; }
        .complete { color: #2e7d32; } .partial { color: #ef6c00; } .failed { color: #c62828; }
        table { border-collapse: collapse; width: 100%; }
        th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
        th { background-color: #4CAF50; color: white; }
        pre { white-space: pre-wrap; word-break: break-all; }
";

/// Render a result as a standalone HTML page.
pub fn render(result: &AnalysisResult) -> String {
    let binary = &result.binary;
    let name = encode_text(&binary.name);
    let status_class = match result.status {
        AnalysisStatus::Complete => "complete",
        AnalysisStatus::Partial => "partial",
        AnalysisStatus::Failed => "failed",
    };

    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n    <meta charset=\"utf-8\">\n    \
         <title>Malware Analysis Report - {name}</title>\n    <style>{STYLE}    </style>\n</head>\n<body>\n"
    );
    let _ = writeln!(html, "    <h1>Malware Analysis Report</h1>");
    let _ = writeln!(html, "    <div class=\"summary\">\n        <h2>Summary</h2>");
    let _ = writeln!(html, "        <p><strong>Binary:</strong> {name}</p>");
    let _ = writeln!(
        html,
        "        <p><strong>Status:</strong> <span class=\"{status_class}\">{}</span></p>",
        result.status
    );
    let _ = writeln!(html, "        <p><strong>SHA-256:</strong> <code>{}</code></p>", binary.sha256);
    let _ = writeln!(html, "        <p><strong>Size:</strong> {} bytes</p>", binary.size_bytes);
    let _ = writeln!(
        html,
        "        <p><strong>Binary Path:</strong> {}</p>",
        encode_text(&binary.original_path.to_string_lossy())
    );
    let _ = writeln!(
        html,
        "        <p><strong>Staged Path:</strong> {}</p>",
        encode_text(&binary.staged_path.to_string_lossy())
    );
    let _ = writeln!(html, "        <p><strong>Executed:</strong> {}</p>", yes_no(binary.run));
    let _ = writeln!(html, "        <p><strong>Run as Admin:</strong> {}</p>", yes_no(binary.as_admin));
    let _ = writeln!(
        html,
        "        <p><strong>Archive Password:</strong> {}</p>",
        yes_no(binary.has_archive_password)
    );
    let _ = writeln!(
        html,
        "        <p><strong>Analysis Date:</strong> {} to {}</p>",
        result.started_at.to_rfc3339(),
        result.finished_at.to_rfc3339()
    );
    let _ = writeln!(html, "    </div>");

    if !result.suppressions.is_empty() || !result.skipped.is_empty() {
        let _ = writeln!(html, "    <div class=\"section\">\n        <h2>Not Run</h2>\n        <ul>");
        for s in &result.suppressions {
            let _ = writeln!(
                html,
                "            <li><strong>{}</strong>: {}</li>",
                encode_text(&s.tool),
                encode_text(&s.reason)
            );
        }
        for s in &result.skipped {
            let _ = writeln!(
                html,
                "            <li><strong>{}</strong>: skipped ({})</li>",
                encode_text(&s.tool),
                s.reason
            );
        }
        let _ = writeln!(html, "        </ul>\n    </div>");
    }

    section(&mut html, "Static Analysis Results", &result.static_results);
    section(&mut html, "Dynamic Analysis Results", &result.dynamic_results);

    let _ = writeln!(html, "    <div class=\"section\">\n        <h2>Procmon Results</h2>");
    match &result.procmon {
        Some(procmon) => {
            if procmon.timer_disabled {
                let _ = writeln!(html, "        <p>Capture window: until stopped</p>");
            } else {
                let _ = writeln!(html, "        <p>Capture window: {} s</p>", procmon.duration_secs);
            }
            tool(&mut html, &procmon.outcome);
        }
        None => {
            let _ = writeln!(html, "        <p>No Procmon data available</p>");
        }
    }
    let _ = writeln!(html, "    </div>\n</body>\n</html>");

    html
}

fn section(html: &mut String, title: &str, outcomes: &[ToolOutcome]) {
    let _ = writeln!(html, "    <div class=\"section\">\n        <h2>{title}</h2>");
    if outcomes.is_empty() {
        let _ = writeln!(html, "        <p>No results available</p>\n    </div>");
        return;
    }

    let _ = writeln!(
        html,
        "        <table>\n            <tr><th>Tool</th><th>Status</th><th>Exit</th><th>Duration</th></tr>"
    );
    for o in outcomes {
        let _ = writeln!(
            html,
            "            <tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            encode_text(&o.tool),
            o.status,
            exit_label(o),
            duration_label(o)
        );
    }
    let _ = writeln!(html, "        </table>");
    for o in outcomes {
        tool(html, o);
    }
    let _ = writeln!(html, "    </div>");
}

fn tool(html: &mut String, outcome: &ToolOutcome) {
    let _ = writeln!(
        html,
        "        <div class=\"tool-result\">\n            <h3>{}</h3>",
        encode_text(&outcome.tool)
    );
    if let Some(executable) = &outcome.executable {
        let _ = writeln!(
            html,
            "            <p><strong>Executable:</strong> <code>{}</code></p>",
            encode_text(&executable.to_string_lossy())
        );
        if !outcome.args.is_empty() {
            let _ = writeln!(
                html,
                "            <p><strong>Arguments:</strong> <code>{}</code></p>",
                encode_text(&outcome.args.join(" "))
            );
        }
    }
    if let Some(reason) = outcome.stop_reason {
        let _ = writeln!(html, "            <p><em>Stopped: {reason}</em></p>");
    }
    if let Some(error) = &outcome.error {
        let _ = writeln!(html, "            <p><strong>Error:</strong> {}</p>", encode_text(error));
    }

    match &outcome.payload {
        ToolPayload::Json { data } => {
            let pretty = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
            let _ = writeln!(html, "            <pre>{}</pre>", encode_text(&pretty));
        }
        ToolPayload::Text { text, truncated } => {
            let _ = writeln!(html, "            <pre>{}</pre>", encode_text(text));
            if *truncated {
                let _ = writeln!(html, "            <p><em>Output truncated.</em></p>");
            }
        }
        ToolPayload::Artifact { path, size_bytes } => {
            let _ = writeln!(
                html,
                "            <p>Artifact: <code>{}</code> ({size_bytes} bytes)</p>",
                encode_text(&path.to_string_lossy())
            );
        }
        ToolPayload::Empty => {
            let _ = writeln!(html, "            <p><em>No output.</em></p>");
        }
    }

    if let Some(stderr) = &outcome.stderr {
        let _ = writeln!(
            html,
            "            <details><summary>stderr</summary><pre>{}</pre></details>",
            encode_text(stderr)
        );
    }
    let _ = writeln!(html, "        </div>");
}
