use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for overseer operations
pub type Result<T> = std::result::Result<T, OverseerError>;

/// Errors that can occur while configuring, running or reporting an analysis
#[derive(Error, Debug)]
pub enum OverseerError {
    /// Configuration is malformed or fails validation
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Configuration file could not be read
    #[error("failed to read configuration {path}: {reason}")]
    ConfigRead {
        /// Path of the configuration file
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// Tool executable could not be located
    #[error("tool not found: {tool}")]
    ToolNotFound {
        /// Logical tool name
        tool: String,
    },

    /// Tool exited unsuccessfully
    #[error("{tool} failed (exit code {})", code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    InvocationFailed {
        /// Logical tool name
        tool: String,
        /// Process exit code, if the OS reported one
        code: Option<i32>,
    },

    /// Tool exceeded its time allowance and was killed
    #[error("{tool} timed out after {seconds} seconds")]
    InvocationTimedOut {
        /// Logical tool name
        tool: String,
        /// Allowance that elapsed
        seconds: u64,
    },

    /// Working directory could not be created
    #[error("failed to prepare directory {path}: {reason}")]
    DirectorySetupFailed {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// Target binary could not be copied into the binary directory
    #[error("failed to stage binary {path}: {reason}")]
    BinaryStagingFailed {
        /// Source path of the target binary
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// Report format is not supported
    #[error("unsupported report format: {0:?}")]
    UnsupportedFormat(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OverseerError {
    /// Returns true if the error prevents a run from starting
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigInvalid(_)
                | Self::ConfigRead { .. }
                | Self::DirectorySetupFailed { .. }
                | Self::BinaryStagingFailed { .. }
        )
    }

    /// Returns true if the error concerns a single tool invocation
    ///
    /// These are recorded in the analysis result and never abort a run.
    #[must_use]
    pub const fn is_per_invocation(&self) -> bool {
        matches!(
            self,
            Self::ToolNotFound { .. } | Self::InvocationFailed { .. } | Self::InvocationTimedOut { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(OverseerError::ConfigInvalid("x".into()).is_fatal());
        assert!(OverseerError::DirectorySetupFailed {
            path: PathBuf::from("/a"),
            reason: "denied".into(),
        }
        .is_fatal());
        assert!(!OverseerError::UnsupportedFormat("pdf".into()).is_fatal());
        assert!(!OverseerError::ToolNotFound { tool: "Capa".into() }.is_fatal());
    }

    #[test]
    fn test_per_invocation_classification() {
        let err = OverseerError::InvocationTimedOut {
            tool: "Floss".into(),
            seconds: 30,
        };
        assert!(err.is_per_invocation());
        assert_eq!(err.to_string(), "Floss timed out after 30 seconds");
    }

    #[test]
    fn test_invocation_failed_message() {
        let err = OverseerError::InvocationFailed {
            tool: "Yara".into(),
            code: Some(2),
        };
        assert_eq!(err.to_string(), "Yara failed (exit code 2)");

        let err = OverseerError::InvocationFailed {
            tool: "Yara".into(),
            code: None,
        };
        assert_eq!(err.to_string(), "Yara failed (exit code none)");
    }

    #[test]
    fn test_unsupported_format_names_value() {
        let err = OverseerError::UnsupportedFormat("pdf".into());
        assert!(err.to_string().contains("\"pdf\""));
    }
}
