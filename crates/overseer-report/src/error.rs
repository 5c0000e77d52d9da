use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for report operations
pub type ReportResult<T> = std::result::Result<T, ReportError>;

/// Errors from report rendering
#[derive(Error, Debug)]
pub enum ReportError {
    /// Requested format is not supported
    #[error("unsupported report format: {0:?}")]
    UnsupportedFormat(String),

    /// Artifact could not be moved into place
    #[error("failed to write report {}: {source}", path.display())]
    Persist {
        /// Final artifact path
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ReportError> for overseer_core::OverseerError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::UnsupportedFormat(format) => Self::UnsupportedFormat(format),
            ReportError::Persist { source, .. } | ReportError::Io(source) => Self::Io(source),
            ReportError::Json(e) => Self::Json(e),
        }
    }
}
