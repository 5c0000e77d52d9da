//! Command implementations.

pub mod open;
pub mod plan;
pub mod report;
pub mod run;
pub mod settings;
pub mod tools;

use anyhow::{Context as _, Result};
use std::path::PathBuf;

use overseer_core::AnalysisConfig;

use crate::config::{expand, Settings};
use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output format
    pub output_format: OutputFormat,

    /// Verbose output
    pub verbose: bool,

    /// Disable colors
    pub no_color: bool,

    /// Analysis configuration given on the command line
    pub config: Option<PathBuf>,

    /// Persistent preferences
    pub settings: Settings,
}

impl Context {
    /// Analysis configuration path from `--config` or the settings file.
    pub fn require_config_path(&self) -> Result<PathBuf> {
        self.config
            .as_deref()
            .map(expand)
            .or_else(|| self.settings.config_path())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Analysis configuration required.\n\n\
                     Set it with one of:\n  \
                     1. --config <FILE>\n  \
                     2. OVERSEER_CONFIG environment variable\n  \
                     3. overseer settings set config_path <FILE>"
                )
            })
    }

    /// Load and validate the analysis configuration.
    pub fn load_config(&self) -> Result<AnalysisConfig> {
        let path = self.require_config_path()?;
        AnalysisConfig::load(&path).with_context(|| format!("loading analysis configuration {}", path.display()))
    }

    /// Whether tables should carry ANSI colors.
    pub const fn color(&self) -> bool {
        !self.no_color
    }
}
