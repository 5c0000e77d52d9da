use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Errors raised while preparing or launching a run
#[derive(Error, Debug)]
pub enum EngineError {
    /// External process could not be spawned
    #[error("failed to launch {tool}: {source}")]
    Launch {
        /// Logical tool name
        tool: String,
        /// Spawn failure
        #[source]
        source: std::io::Error,
    },

    /// Invocation has no executable to launch
    #[error("no executable resolved for {tool}")]
    Unresolved {
        /// Logical tool name
        tool: String,
    },

    /// Working directory could not be created
    #[error("failed to create {}: {source}", path.display())]
    DirectorySetup {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// Target could not be copied or hashed
    #[error("failed to stage {}: {source}", path.display())]
    Staging {
        /// Source path of the target
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },
}

impl From<EngineError> for overseer_core::OverseerError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Launch { tool, .. } => Self::InvocationFailed { tool, code: None },
            EngineError::Unresolved { tool } => Self::ToolNotFound { tool },
            EngineError::DirectorySetup { path, source } => Self::DirectorySetupFailed {
                path,
                reason: source.to_string(),
            },
            EngineError::Staging { path, source } => Self::BinaryStagingFailed {
                path,
                reason: source.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overseer_core::OverseerError;

    #[test]
    fn test_setup_errors_stay_fatal() {
        let err: OverseerError = EngineError::DirectorySetup {
            path: PathBuf::from("/ro/analysis"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        }
        .into();
        assert!(err.is_fatal());
        assert!(matches!(err, OverseerError::DirectorySetupFailed { .. }));

        let err: OverseerError = EngineError::Staging {
            path: PathBuf::from("/in/sample.exe"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
        .into();
        assert!(matches!(err, OverseerError::BinaryStagingFailed { .. }));
    }

    #[test]
    fn test_launch_errors_are_per_invocation() {
        let err: OverseerError = EngineError::Launch {
            tool: "Capa".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
        .into();
        assert!(err.is_per_invocation());
    }

    #[test]
    fn test_every_variant_maps_to_a_typed_error() {
        let io = || std::io::Error::from(std::io::ErrorKind::Other);
        let mapped: Vec<OverseerError> = vec![
            EngineError::Launch { tool: "Capa".into(), source: io() }.into(),
            EngineError::Unresolved { tool: "Capa".into() }.into(),
            EngineError::DirectorySetup { path: PathBuf::from("/a"), source: io() }.into(),
            EngineError::Staging { path: PathBuf::from("/b"), source: io() }.into(),
        ];
        assert!(matches!(mapped[1], OverseerError::ToolNotFound { ref tool } if tool == "Capa"));
        assert!(mapped.iter().all(|e| !matches!(e, OverseerError::Io(_))));
    }
}
