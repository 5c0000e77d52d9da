use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Whether a tool inspects the binary at rest or observes it running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    /// Inspects the binary without executing it
    Static,
    /// Observes the binary while it executes
    Dynamic,
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Dynamic => write!(f, "dynamic"),
        }
    }
}

/// Where an invocation sits in the orchestration sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStage {
    /// Static tool, independent of every other invocation
    Static,
    /// Runs to completion before the target starts
    Prepare,
    /// Started before the target and stopped when the capture session ends
    Monitor,
    /// Executes the target (the target itself, or a tool that launches it)
    Execute,
}

impl ToolStage {
    /// The category implied by this stage
    #[must_use]
    pub const fn category(self) -> ToolCategory {
        match self {
            Self::Static => ToolCategory::Static,
            Self::Prepare | Self::Monitor | Self::Execute => ToolCategory::Dynamic,
        }
    }
}

impl std::fmt::Display for ToolStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Prepare => write!(f, "prepare"),
            Self::Monitor => write!(f, "monitor"),
            Self::Execute => write!(f, "execute"),
        }
    }
}

/// How a tool's output is turned into a result payload once it exits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum HarvestStrategy {
    /// Parse standard output as JSON, falling back to text
    StdoutJson,
    /// Capture standard output as text
    StdoutText,
    /// Read a side file written by the tool as text
    SideFileText {
        /// Extension of the side file
        extension: &'static str,
    },
    /// Reference a (usually binary) side file by path and size
    SideFileArtifact {
        /// Extension of the side file
        extension: &'static str,
    },
    /// The tool produces nothing worth collecting
    Nothing,
}

impl HarvestStrategy {
    /// Extension of the side file this strategy reads, if any
    #[must_use]
    pub const fn side_file_extension(&self) -> Option<&'static str> {
        match self {
            Self::SideFileText { extension } | Self::SideFileArtifact { extension } => {
                Some(*extension)
            }
            _ => None,
        }
    }
}

/// Identity of a launchable analysis tool.
///
/// Descriptors live in the static [`CATALOG`](crate::CATALOG) and never change.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ToolDescriptor {
    /// Logical name as used in configuration (`"Capa"`, `"Procmon"`)
    pub name: &'static str,
    /// Executable base name without platform suffix
    pub executable: &'static str,
    /// Static or dynamic
    pub category: ToolCategory,
    /// Orchestration stage
    pub stage: ToolStage,
    /// Argument template; see [`crate::tools`] for placeholders
    pub args: &'static [&'static str],
    /// Result collection strategy
    pub harvest: HarvestStrategy,
}

impl ToolDescriptor {
    /// File name of the side file this tool writes, if it writes one
    #[must_use]
    pub fn output_file_name(&self) -> Option<String> {
        self.harvest
            .side_file_extension()
            .map(|ext| format!("{}.{ext}", self.executable))
    }

    /// Directory name used for this tool's output under the analysis directory
    #[must_use]
    pub fn output_dir_name(&self) -> String {
        self.name.to_lowercase()
    }
}

/// How an executable was located
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionSource {
    /// User-supplied path
    Custom,
    /// Found on the process search path
    PathEnv,
    /// Found in the per-OS default install locations
    DefaultLocation,
    /// Found beside the running program
    LocalDir,
}

impl std::fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Custom => write!(f, "custom"),
            Self::PathEnv => write!(f, "path-env"),
            Self::DefaultLocation => write!(f, "default-location"),
            Self::LocalDir => write!(f, "local-dir"),
        }
    }
}

/// A tool paired with a verified-present executable
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedTool {
    /// The tool that was resolved
    pub descriptor: &'static ToolDescriptor,
    /// Absolute path to the executable
    pub path: PathBuf,
    /// Which search step produced the path
    pub source: ResolutionSource,
}
