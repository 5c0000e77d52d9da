//! Declarative analysis configuration.

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{OverseerError, Result};
use crate::tools::PROCMON;

/// Default Process Monitor capture duration in seconds.
pub const DEFAULT_PROCMON_DURATION: u64 = 60;

/// Everything a single analysis run is started from.
///
/// Supplied once per run and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Working directories
    #[serde(default)]
    pub paths: WorkPaths,

    /// Static tool toggles, in invocation order
    #[serde(default)]
    pub static_tools: ToolToggles,

    /// Dynamic tool toggles, in invocation order
    #[serde(default)]
    pub dynamic_tools: ToolToggles,

    /// Process Monitor capture settings
    #[serde(default)]
    pub procmon_settings: ProcmonSettings,

    /// The target binary
    pub binary: BinaryConfig,

    /// Virtual machine the analysis is meant for (carried as metadata)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm: Option<VmConfig>,

    /// Custom executable locations by tool name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tool_paths: BTreeMap<String, PathBuf>,
}

/// Working directories for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkPaths {
    /// Tool output and reports
    #[serde(default = "default_analysis_dir")]
    pub analysis: PathBuf,
    /// Tool installations
    #[serde(default = "default_tools_dir")]
    pub tools: PathBuf,
    /// Staged copy of the target
    #[serde(default = "default_binary_dir")]
    pub binary: PathBuf,
    /// Helper files (rules, saved tool configs)
    #[serde(default = "default_utils_dir")]
    pub utils: PathBuf,
    /// Desktop of the analysis user
    #[serde(default = "default_desktop_dir")]
    pub desktop: PathBuf,
}

impl Default for WorkPaths {
    fn default() -> Self {
        Self {
            analysis: default_analysis_dir(),
            tools: default_tools_dir(),
            binary: default_binary_dir(),
            utils: default_utils_dir(),
            desktop: default_desktop_dir(),
        }
    }
}

impl WorkPaths {
    /// Every directory a run needs, in creation order.
    #[must_use]
    pub fn all(&self) -> [&Path; 5] {
        [
            self.analysis.as_path(),
            self.tools.as_path(),
            self.binary.as_path(),
            self.utils.as_path(),
            self.desktop.as_path(),
        ]
    }

    /// Directory reports are written to.
    #[must_use]
    pub fn reports(&self) -> PathBuf {
        self.analysis.join("reports")
    }

    /// Output directory for one tool.
    #[must_use]
    pub fn tool_output(&self, dir_name: &str) -> PathBuf {
        self.analysis.join(dir_name)
    }

    fn expand(&mut self) {
        for path in [
            &mut self.analysis,
            &mut self.tools,
            &mut self.binary,
            &mut self.utils,
            &mut self.desktop,
        ] {
            *path = expand_tilde(path);
        }
    }
}

fn default_analysis_dir() -> PathBuf {
    PathBuf::from("./analysis")
}

fn default_tools_dir() -> PathBuf {
    PathBuf::from("./tools")
}

fn default_binary_dir() -> PathBuf {
    PathBuf::from("./binary")
}

fn default_utils_dir() -> PathBuf {
    PathBuf::from("./utils")
}

fn default_desktop_dir() -> PathBuf {
    PathBuf::from("./")
}

/// Ordered map of tool name to enabled flag.
///
/// Order is the order the entries appear in the source document, which is
/// also the invocation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolToggles(Vec<(String, bool)>);

impl ToolToggles {
    /// Names of enabled tools, in order.
    pub fn enabled(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, on)| *on)
            .map(|(name, _)| name.as_str())
    }

    /// Whether a tool is present and enabled (case-insensitive).
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.0
            .iter()
            .any(|(n, on)| *on && n.eq_ignore_ascii_case(name))
    }

    /// Position of a tool in the map (case-insensitive).
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Set a toggle, appending it if absent.
    pub fn set(&mut self, name: &str, enabled: bool) {
        match self.position(name) {
            Some(i) => self.0[i].1 = enabled,
            None => self.0.push((name.to_string(), enabled)),
        }
    }

    /// All entries, in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(n, on)| (n.as_str(), *on))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, bool)> for ToolToggles {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        let mut toggles = Self::default();
        for (name, on) in iter {
            let name: String = name.into();
            toggles.set(&name, on);
        }
        toggles
    }
}

impl Serialize for ToolToggles {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, on) in &self.0 {
            map.serialize_entry(name, on)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ToolToggles {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct TogglesVisitor;

        impl<'de> Visitor<'de> for TogglesVisitor {
            type Value = ToolToggles;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of tool name to boolean")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
                let mut toggles = ToolToggles::default();
                while let Some((name, on)) = access.next_entry::<String, bool>()? {
                    toggles.set(&name, on);
                }
                Ok(toggles)
            }
        }

        deserializer.deserialize_map(TogglesVisitor)
    }
}

/// Process Monitor capture settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcmonSettings {
    /// Capture with Process Monitor
    #[serde(default)]
    pub enabled: bool,

    /// Capture duration in seconds (number or numeric string)
    #[serde(default = "default_duration", deserialize_with = "deserialize_duration")]
    pub duration: u64,

    /// Run until explicitly stopped instead of for `duration`
    #[serde(default)]
    pub disable_timer: bool,
}

impl Default for ProcmonSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            duration: DEFAULT_PROCMON_DURATION,
            disable_timer: false,
        }
    }
}

const fn default_duration() -> u64 {
    DEFAULT_PROCMON_DURATION
}

fn deserialize_duration<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => u64::try_from(n)
            .map_err(|_| de::Error::custom(format!("duration must be non-negative, got {n}"))),
        Raw::Text(s) if s.trim().is_empty() => Ok(DEFAULT_PROCMON_DURATION),
        Raw::Text(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| de::Error::custom(format!("duration must be a non-negative integer, got {s:?}"))),
    }
}

/// The target binary and how to treat it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryConfig {
    /// Path to the binary (or archive) to analyse
    pub path: PathBuf,

    /// Execute the binary during dynamic analysis
    #[serde(default)]
    pub run: bool,

    /// Request elevated privileges when executing it
    #[serde(default)]
    pub as_admin: bool,

    /// Archive password (empty means none)
    #[serde(
        default,
        alias = "password",
        deserialize_with = "deserialize_password",
        skip_serializing_if = "Option::is_none"
    )]
    pub bin_pass: Option<String>,
}

fn deserialize_password<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()))
}

/// Virtual machine details.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmConfig {
    /// Hypervisor (`vmware`, `virtualbox`)
    #[serde(default, rename = "type")]
    pub vm_type: Option<String>,
    /// Path to the VM definition
    #[serde(default)]
    pub path: Option<String>,
    /// Snapshot to revert to
    #[serde(default)]
    pub snapshot: Option<String>,
    /// Guest user
    #[serde(default)]
    pub username: Option<String>,
    /// Guest password (never serialized)
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl fmt::Debug for VmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VmConfig")
            .field("vm_type", &self.vm_type)
            .field("path", &self.path)
            .field("snapshot", &self.snapshot)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}

impl AnalysisConfig {
    /// Minimal configuration for a target with every tool disabled.
    #[must_use]
    pub fn for_binary(path: impl Into<PathBuf>) -> Self {
        Self {
            paths: WorkPaths::default(),
            static_tools: ToolToggles::default(),
            dynamic_tools: ToolToggles::default(),
            procmon_settings: ProcmonSettings::default(),
            binary: BinaryConfig {
                path: path.into(),
                run: false,
                as_admin: false,
                bin_pass: None,
            },
            vm: None,
            tool_paths: BTreeMap::new(),
        }
    }

    /// Load, normalise and validate a configuration file.
    ///
    /// Files ending in `.toml` are parsed as TOML, everything else as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| OverseerError::ConfigRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let config = if is_toml {
            Self::from_toml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document and expand `~` in paths. Does not validate.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let mut config: Self =
            serde_json::from_str(content).map_err(|e| OverseerError::ConfigInvalid(e.to_string()))?;
        config.normalize();
        Ok(config)
    }

    /// Parse a TOML document and expand `~` in paths. Does not validate.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Self =
            toml::from_str(content).map_err(|e| OverseerError::ConfigInvalid(e.to_string()))?;
        config.normalize();
        Ok(config)
    }

    fn normalize(&mut self) {
        self.paths.expand();
        self.binary.path = expand_tilde(&self.binary.path);
        for path in self.tool_paths.values_mut() {
            *path = expand_tilde(path);
        }
    }

    /// Check the invariants a run depends on.
    pub fn validate(&self) -> Result<()> {
        if self.binary.path.as_os_str().is_empty() {
            return Err(OverseerError::ConfigInvalid("binary.path is empty".into()));
        }
        if !self.binary.path.is_file() {
            return Err(OverseerError::ConfigInvalid(format!(
                "binary.path {} is not an existing file",
                self.binary.path.display()
            )));
        }
        Ok(())
    }

    /// Whether Process Monitor was asked for, by toggle or by its settings block.
    #[must_use]
    pub fn procmon_requested(&self) -> bool {
        self.procmon_settings.enabled || self.dynamic_tools.is_enabled(PROCMON)
    }

    /// Custom executable path for a tool, if one was configured (case-insensitive).
    #[must_use]
    pub fn tool_path(&self, name: &str) -> Option<&Path> {
        self.tool_paths
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, p)| p.as_path())
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    path.to_str().map_or_else(
        || path.to_path_buf(),
        |s| PathBuf::from(shellexpand::tilde(s).into_owned()),
    )
}
