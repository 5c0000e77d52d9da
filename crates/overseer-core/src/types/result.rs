//! Analysis result aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::plan::{SkipReason, Suppression};
use super::tool::{ToolCategory, ToolStage};

/// Lifecycle state of one invocation
///
/// `Pending -> Launched -> Running -> {Succeeded, Failed, TimedOut, Killed}`,
/// or `Pending -> Skipped` when nothing was launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvocationStatus {
    /// Not yet considered
    Pending,
    /// Process spawn requested
    Launched,
    /// Process is alive
    Running,
    /// Exited with code zero
    Succeeded,
    /// Exited with a non-zero code, or could not be spawned
    Failed,
    /// Exceeded its hard ceiling and was killed
    TimedOut,
    /// Forcibly terminated
    Killed,
    /// Never launched
    Skipped,
}

impl InvocationStatus {
    /// Returns true once no further transition is possible
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::TimedOut | Self::Killed | Self::Skipped
        )
    }

    /// Returns true while a process may still be alive
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Launched | Self::Running)
    }
}

impl std::fmt::Display for InvocationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Launched => write!(f, "launched"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::TimedOut => write!(f, "timed-out"),
            Self::Killed => write!(f, "killed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Why a process was killed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    /// Its configured duration elapsed
    BudgetElapsed,
    /// The capture session it was monitoring ended
    SessionEnded,
    /// The caller requested a stop
    StopRequested,
    /// The hard ceiling for natural termination elapsed
    CeilingReached,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BudgetElapsed => write!(f, "budget-elapsed"),
            Self::SessionEnded => write!(f, "session-ended"),
            Self::StopRequested => write!(f, "stop-requested"),
            Self::CeilingReached => write!(f, "ceiling-reached"),
        }
    }
}

/// Collected output of one tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ToolPayload {
    /// Structured output
    Json {
        /// Parsed document
        data: serde_json::Value,
    },
    /// Plain text output
    Text {
        /// Captured text
        text: String,
        /// Capture hit the size cap
        #[serde(default)]
        truncated: bool,
    },
    /// A file the tool wrote, referenced rather than inlined
    Artifact {
        /// Location of the file
        path: PathBuf,
        /// Size in bytes
        size_bytes: u64,
    },
    /// Nothing collected
    Empty,
}

impl ToolPayload {
    /// Returns true if nothing was collected
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Outcome of one planned invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// Logical tool name
    pub tool: String,
    /// Static or dynamic
    pub category: ToolCategory,
    /// Orchestration stage
    pub stage: ToolStage,
    /// Terminal state
    pub status: InvocationStatus,
    /// Set when the process was killed or timed out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
    /// Set when the invocation was never launched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    /// Executable that was launched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,
    /// Arguments it was launched with
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// OS process id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// Exit code, if the process exited on its own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Launch time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Time the terminal state was reached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Wall-clock duration in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Harvested output
    pub payload: ToolPayload,
    /// Captured standard error, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    /// Failure description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutcome {
    /// Outcome for an invocation that never launched.
    #[must_use]
    pub fn skipped(tool: &str, category: ToolCategory, stage: ToolStage, reason: SkipReason) -> Self {
        Self {
            tool: tool.to_string(),
            category,
            stage,
            status: InvocationStatus::Skipped,
            stop_reason: None,
            skip_reason: Some(reason),
            executable: None,
            args: Vec::new(),
            pid: None,
            exit_code: None,
            started_at: None,
            finished_at: None,
            duration_ms: None,
            payload: ToolPayload::Empty,
            stderr: None,
            error: None,
        }
    }

    /// Whether this outcome is what the plan expected.
    ///
    /// Processes stopped because their capture window closed count as expected.
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        match self.status {
            InvocationStatus::Succeeded | InvocationStatus::Skipped => true,
            InvocationStatus::Killed => matches!(
                self.stop_reason,
                Some(StopReason::BudgetElapsed | StopReason::SessionEnded)
            ),
            _ => false,
        }
    }
}

/// Overall verdict of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    /// Every invocation succeeded or was skipped
    Complete,
    /// Some invocations failed, some succeeded
    Partial,
    /// Every launched invocation failed
    Failed,
}

impl AnalysisStatus {
    /// Derive the overall status from individual outcomes.
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a ToolOutcome>) -> Self {
        let mut launched = 0usize;
        let mut failed = 0usize;
        for outcome in outcomes {
            if outcome.status == InvocationStatus::Skipped {
                continue;
            }
            launched += 1;
            if !outcome.is_expected() {
                failed += 1;
            }
        }

        if failed == 0 {
            Self::Complete
        } else if failed == launched {
            Self::Failed
        } else {
            Self::Partial
        }
    }
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Partial => write!(f, "partial"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Metadata about the analysed binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryMetadata {
    /// File name
    pub name: String,
    /// Caller's original path
    pub original_path: PathBuf,
    /// Staged copy that tools were pointed at
    pub staged_path: PathBuf,
    /// Size in bytes
    pub size_bytes: u64,
    /// SHA-256 hex digest
    pub sha256: String,
    /// Executed during dynamic analysis
    pub run: bool,
    /// Elevation was requested
    pub as_admin: bool,
    /// An archive password was supplied
    pub has_archive_password: bool,
}

/// Process Monitor capture section of a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcmonReport {
    /// Configured duration in seconds
    pub duration_secs: u64,
    /// Capture ran until explicitly stopped
    pub timer_disabled: bool,
    /// The capture invocation
    pub outcome: ToolOutcome,
}

/// A tool that was requested but not run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipRecord {
    /// Tool name
    pub tool: String,
    /// Why it did not run
    pub reason: SkipReason,
}

/// Everything a run produced.
///
/// Plain data with no live process references; the only input to reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// The analysed binary
    pub binary: BinaryMetadata,
    /// Overall verdict
    pub status: AnalysisStatus,
    /// Run start
    pub started_at: DateTime<Utc>,
    /// Run end
    pub finished_at: DateTime<Utc>,
    /// Static tool outcomes in plan order
    #[serde(default)]
    pub static_results: Vec<ToolOutcome>,
    /// Dynamic tool outcomes in plan order (Process Monitor excluded)
    #[serde(default)]
    pub dynamic_results: Vec<ToolOutcome>,
    /// Process Monitor capture, when it was planned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procmon: Option<ProcmonReport>,
    /// Tools dropped by conflict resolution
    #[serde(default)]
    pub suppressions: Vec<Suppression>,
    /// Tools requested but not run
    #[serde(default)]
    pub skipped: Vec<SkipRecord>,
}

impl AnalysisResult {
    /// Every outcome, Process Monitor included.
    pub fn outcomes(&self) -> impl Iterator<Item = &ToolOutcome> {
        self.static_results
            .iter()
            .chain(self.dynamic_results.iter())
            .chain(self.procmon.as_ref().map(|p| &p.outcome))
    }

    /// Find an outcome by tool name (case-insensitive).
    #[must_use]
    pub fn outcome(&self, tool: &str) -> Option<&ToolOutcome> {
        self.outcomes().find(|o| o.tool.eq_ignore_ascii_case(tool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: InvocationStatus, stop: Option<StopReason>) -> ToolOutcome {
        let mut o = ToolOutcome::skipped("T", ToolCategory::Static, ToolStage::Static, SkipReason::ToolNotFound);
        o.status = status;
        o.skip_reason = None;
        o.stop_reason = stop;
        o
    }

    #[test]
    fn test_status_empty_is_complete() {
        assert_eq!(AnalysisStatus::from_outcomes(&[]), AnalysisStatus::Complete);
    }

    #[test]
    fn test_status_all_skipped_is_complete() {
        let outcomes = vec![
            ToolOutcome::skipped("Capa", ToolCategory::Static, ToolStage::Static, SkipReason::ToolNotFound),
            ToolOutcome::skipped("Yara", ToolCategory::Static, ToolStage::Static, SkipReason::UnknownTool),
        ];
        assert_eq!(AnalysisStatus::from_outcomes(&outcomes), AnalysisStatus::Complete);
    }

    #[test]
    fn test_status_partial_and_failed() {
        let ok = outcome(InvocationStatus::Succeeded, None);
        let bad = outcome(InvocationStatus::Failed, None);
        let slow = outcome(InvocationStatus::TimedOut, Some(StopReason::CeilingReached));

        assert_eq!(
            AnalysisStatus::from_outcomes(&[ok.clone(), bad.clone()]),
            AnalysisStatus::Partial
        );
        assert_eq!(AnalysisStatus::from_outcomes(&[bad, slow]), AnalysisStatus::Failed);
        assert_eq!(AnalysisStatus::from_outcomes(&[ok]), AnalysisStatus::Complete);
    }

    #[test]
    fn test_expected_kills() {
        assert!(outcome(InvocationStatus::Killed, Some(StopReason::BudgetElapsed)).is_expected());
        assert!(outcome(InvocationStatus::Killed, Some(StopReason::SessionEnded)).is_expected());
        assert!(!outcome(InvocationStatus::Killed, Some(StopReason::StopRequested)).is_expected());
        assert!(!outcome(InvocationStatus::Killed, None).is_expected());
    }

    #[test]
    fn test_status_terminality() {
        assert!(InvocationStatus::Killed.is_terminal());
        assert!(InvocationStatus::Skipped.is_terminal());
        assert!(!InvocationStatus::Running.is_terminal());
        assert!(InvocationStatus::Launched.is_running());
    }

    #[test]
    fn test_payload_tagging() {
        let payload = ToolPayload::Text {
            text: "hello".into(),
            truncated: false,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "text");
        assert_eq!(json["text"], "hello");
    }
}
