use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ReportError;

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Full-fidelity structured data
    Json,
    /// Human-readable Markdown document
    Markdown,
    /// Self-contained HTML page
    Html,
}

impl ReportFormat {
    /// Every supported format
    pub const ALL: [Self; 3] = [Self::Json, Self::Markdown, Self::Html];

    /// File extension for artifacts in this format
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
            Self::Html => "html",
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Markdown => write!(f, "markdown"),
            Self::Html => write!(f, "html"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            "html" | "htm" => Ok(Self::Html),
            _ => Err(ReportError::UnsupportedFormat(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("JSON".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert_eq!("md".parse::<ReportFormat>().unwrap(), ReportFormat::Markdown);
        assert_eq!(" html ".parse::<ReportFormat>().unwrap(), ReportFormat::Html);
    }

    #[test]
    fn test_unsupported_names_value() {
        let err = "pdf".parse::<ReportFormat>().unwrap_err();
        assert!(matches!(&err, ReportError::UnsupportedFormat(v) if v == "pdf"));
        assert_eq!(err.to_string(), "unsupported report format: \"pdf\"");
    }
}
