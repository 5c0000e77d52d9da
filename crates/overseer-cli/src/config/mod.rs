//! CLI settings management.

use anyhow::{Context as _, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use overseer_engine::{LaunchOptions, OrchestratorOptions};
use overseer_report::ReportFormat;

use crate::output::OutputFormat;

/// Environment variable overriding the settings file location.
pub const SETTINGS_ENV: &str = "OVERSEER_SETTINGS";

/// Persistent CLI preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Analysis configuration used when `--config` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,

    /// Default output format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<OutputFormat>,

    /// Report formats written after a run.
    #[serde(default = "default_report_formats")]
    pub report_formats: Vec<ReportFormat>,

    /// Static tools allowed to run at once.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Hard ceiling for a static tool, in seconds.
    #[serde(default = "default_static_ceiling")]
    pub static_ceiling_secs: u64,

    /// Hard ceiling for prepare and execute invocations, in seconds.
    #[serde(default = "default_dynamic_ceiling")]
    pub dynamic_ceiling_secs: u64,

    /// Command prefixed to invocations that ask for elevation (e.g. `["sudo", "-n"]`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elevation_command: Vec<String>,
}

fn default_report_formats() -> Vec<ReportFormat> {
    ReportFormat::ALL.to_vec()
}

const fn default_max_parallel() -> usize {
    4
}

const fn default_static_ceiling() -> u64 {
    30 * 60
}

const fn default_dynamic_ceiling() -> u64 {
    10 * 60
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_path: None,
            output_format: None,
            report_formats: default_report_formats(),
            max_parallel: default_max_parallel(),
            static_ceiling_secs: default_static_ceiling(),
            dynamic_ceiling_secs: default_dynamic_ceiling(),
            elevation_command: Vec::new(),
        }
    }
}

impl Settings {
    /// Get the settings file path.
    pub fn path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(SETTINGS_ENV) {
            return Ok(PathBuf::from(path));
        }

        let dirs = ProjectDirs::from("rs", "overseer", "overseer")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("settings.toml"))
    }

    /// Load settings from file, falling back to defaults when absent.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading settings {}", path.display()))?;
        let settings: Self =
            toml::from_str(&content).with_context(|| format!("parsing settings {}", path.display()))?;

        Ok(settings)
    }

    /// Save settings to file.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Update one key from its textual value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "config_path" | "config" => {
                self.config_path = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            "output_format" | "output" => {
                self.output_format = Some(value.parse()?);
            }
            "report_formats" | "reports" => {
                self.report_formats = parse_formats(value.split(','))?;
            }
            "max_parallel" => {
                let n: usize = value.parse()?;
                anyhow::ensure!(n > 0, "max_parallel must be at least 1");
                self.max_parallel = n;
            }
            "static_ceiling_secs" => {
                let secs: u64 = value.parse()?;
                anyhow::ensure!(secs > 0, "static_ceiling_secs must be at least 1");
                self.static_ceiling_secs = secs;
            }
            "dynamic_ceiling_secs" => {
                let secs: u64 = value.parse()?;
                anyhow::ensure!(secs > 0, "dynamic_ceiling_secs must be at least 1");
                self.dynamic_ceiling_secs = secs;
            }
            "elevation_command" => {
                self.elevation_command = value.split_whitespace().map(String::from).collect();
            }
            _ => {
                anyhow::bail!(
                    "Unknown settings key: {key}\n\n\
                     Available keys:\n  \
                     config_path          - Default analysis configuration file\n  \
                     output_format        - Default output format (pretty/json/csv/yaml)\n  \
                     report_formats       - Reports written after a run (json,markdown,html)\n  \
                     max_parallel         - Static tools run at once\n  \
                     static_ceiling_secs  - Hard limit for one static tool\n  \
                     dynamic_ceiling_secs - Hard limit for prepare/execute tools\n  \
                     elevation_command    - Prefix for elevated launches (e.g. \"sudo -n\")"
                );
            }
        }
        Ok(())
    }

    /// Orchestrator options derived from these settings.
    pub fn orchestrator_options(&self) -> OrchestratorOptions {
        OrchestratorOptions {
            max_parallel: self.max_parallel.max(1),
            static_ceiling: Duration::from_secs(self.static_ceiling_secs.max(1)),
            dynamic_ceiling: Duration::from_secs(self.dynamic_ceiling_secs.max(1)),
            launch: LaunchOptions {
                elevation_command: self.elevation_command.clone(),
                ..LaunchOptions::default()
            },
        }
    }

    /// Default analysis configuration with `~` expanded.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config_path.as_deref().map(expand)
    }
}

/// Expand `~` in a user-supplied path.
pub fn expand(path: &std::path::Path) -> PathBuf {
    path.to_str().map_or_else(
        || path.to_path_buf(),
        |s| PathBuf::from(shellexpand::tilde(s).into_owned()),
    )
}

/// Parse report format names, rejecting unknown ones.
pub fn parse_formats<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Vec<ReportFormat>> {
    let mut formats = Vec::new();
    for name in names {
        if name.trim().is_empty() {
            continue;
        }
        formats.push(name.parse::<ReportFormat>()?);
    }
    Ok(formats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.report_formats, ReportFormat::ALL.to_vec());
    }

    #[test]
    fn test_set_known_keys() {
        let mut settings = Settings::default();
        settings.set("reports", "md, html").unwrap();
        settings.set("max_parallel", "2").unwrap();
        settings.set("elevation_command", "sudo -n").unwrap();
        settings.set("output", "json").unwrap();

        assert_eq!(settings.report_formats, vec![ReportFormat::Markdown, ReportFormat::Html]);
        assert_eq!(settings.elevation_command, vec!["sudo", "-n"]);
        assert_eq!(settings.output_format, Some(OutputFormat::Json));

        let options = settings.orchestrator_options();
        assert_eq!(options.max_parallel, 2);
        assert_eq!(options.launch.elevation_command, vec!["sudo", "-n"]);
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut settings = Settings::default();
        assert!(settings.set("reports", "pdf").is_err());
        assert!(settings.set("max_parallel", "0").is_err());
        assert!(settings.set("static_ceiling_secs", "0").is_err());
        assert!(settings.set("dynamic_ceiling_secs", "0").is_err());
        assert!(settings.set("dynamic_ceiling_secs", "-5").is_err());
        assert!(settings.set("colour", "on").is_err());
        assert_eq!(settings, Settings::default());

        settings.set("static_ceiling_secs", "1").unwrap();
        settings.set("dynamic_ceiling_secs", "90").unwrap();
        assert_eq!(settings.static_ceiling_secs, 1);
        assert_eq!(settings.dynamic_ceiling_secs, 90);
    }

    #[test]
    fn test_zero_ceilings_from_file_are_clamped() {
        let settings: Settings = toml::from_str("static_ceiling_secs = 0\ndynamic_ceiling_secs = 0\n").unwrap();
        let options = settings.orchestrator_options();
        assert_eq!(options.static_ceiling, Duration::from_secs(1));
        assert_eq!(options.dynamic_ceiling, Duration::from_secs(1));
    }

    #[test]
    fn test_round_trip_toml() {
        let mut settings = Settings::default();
        settings.config_path = Some(PathBuf::from("/cfg/overseer.json"));
        let text = toml::to_string_pretty(&settings).unwrap();
        assert_eq!(toml::from_str::<Settings>(&text).unwrap(), settings);
    }
}
