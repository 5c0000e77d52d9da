//! Run plan types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::tool::{HarvestStrategy, ResolutionSource, ToolCategory, ToolStage};

/// Why an invocation was not launched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// No executable could be resolved
    ToolNotFound,
    /// The tool name is not in the catalog
    UnknownTool,
    /// A stop was requested before the invocation could launch
    Cancelled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ToolNotFound => write!(f, "tool-not-found"),
            Self::UnknownTool => write!(f, "unknown-tool"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A tool that was enabled but will not run because of a conflicting selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suppression {
    /// Suppressed tool
    pub tool: String,
    /// Human-readable reason
    pub reason: String,
}

/// Time allowance attached to an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBudget {
    /// Configured duration in seconds
    pub seconds: u64,
    /// Run until explicitly stopped; `seconds` is advisory only
    pub timer_disabled: bool,
}

impl TimeBudget {
    /// The duration after which the invocation is stopped, if it is timed.
    #[must_use]
    pub const fn deadline(&self) -> Option<std::time::Duration> {
        if self.timer_disabled {
            None
        } else {
            Some(std::time::Duration::from_secs(self.seconds))
        }
    }
}

/// The target binary as the plan expects to find it after staging
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedTarget {
    /// Caller's original file (copied, never moved)
    pub source: PathBuf,
    /// Where the copy will live
    pub staged: PathBuf,
    /// Execute it during dynamic analysis
    pub run: bool,
    /// Request elevation when executing it
    pub as_admin: bool,
    /// An archive password was supplied
    pub has_archive_password: bool,
}

impl PlannedTarget {
    /// File name of the staged target.
    #[must_use]
    pub fn name(&self) -> String {
        self.staged
            .file_name()
            .map_or_else(|| "unknown".to_string(), |n| n.to_string_lossy().into_owned())
    }
}

/// One tool launch the orchestrator will attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedInvocation {
    /// Logical tool name
    pub tool: String,
    /// Static or dynamic
    pub category: ToolCategory,
    /// Orchestration stage
    pub stage: ToolStage,
    /// Resolved executable (None when unresolved)
    pub executable: Option<PathBuf>,
    /// How the executable was found
    pub source: Option<ResolutionSource>,
    /// Fully expanded arguments
    pub args: Vec<String>,
    /// Working directory (the tool's output directory)
    pub working_dir: PathBuf,
    /// Side file harvested after exit
    pub output_path: Option<PathBuf>,
    /// How the result payload is collected
    pub harvest: HarvestStrategy,
    /// Time allowance (Process Monitor only)
    pub time_budget: Option<TimeBudget>,
    /// Request elevated privileges
    pub elevate: bool,
    /// Set when the invocation will not be launched
    pub skip: Option<SkipReason>,
    /// Resolution remarks worth surfacing in the report
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl PlannedInvocation {
    /// Whether the invocation goes straight from pending to skipped.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        self.skip.is_some()
    }
}

/// Validated, conflict-resolved execution plan for one run.
///
/// Built once per run and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunPlan {
    /// Target binary
    pub target: PlannedTarget,
    /// Static invocations in configuration order
    pub static_invocations: Vec<PlannedInvocation>,
    /// Dynamic invocations in configuration order, target execution last
    pub dynamic_invocations: Vec<PlannedInvocation>,
    /// Enabled tools dropped by conflict resolution
    pub suppressions: Vec<Suppression>,
}

impl RunPlan {
    /// All invocations, static first.
    pub fn invocations(&self) -> impl Iterator<Item = &PlannedInvocation> {
        self.static_invocations
            .iter()
            .chain(self.dynamic_invocations.iter())
    }

    /// Invocations that will actually be launched.
    pub fn active(&self) -> impl Iterator<Item = &PlannedInvocation> {
        self.invocations().filter(|i| !i.is_skipped())
    }

    /// Find an invocation by tool name (case-insensitive).
    #[must_use]
    pub fn invocation(&self, tool: &str) -> Option<&PlannedInvocation> {
        self.invocations().find(|i| i.tool.eq_ignore_ascii_case(tool))
    }

    /// Total number of planned invocations, skipped ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.static_invocations.len() + self.dynamic_invocations.len()
    }

    /// Whether the plan has no invocations at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
