//! Executable discovery.
//!
//! Lookup order, first hit wins:
//!
//! 1. the caller's custom path, when it names an existing file
//! 2. every directory of the search path, trying each platform suffix
//! 3. the platform's default install locations
//! 4. the directory the running program lives in
//!
//! A miss is a normal outcome. Nothing is cached, so tools installed while a
//! session is open are picked up by the next lookup.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use overseer_core::{ResolutionSource, ResolvedTool, ToolDescriptor, CATALOG};

use crate::locations::{candidates, HostOs, LocationEntry, DEFAULT_LOCATIONS};

/// Everything resolution depends on apart from the filesystem itself
#[derive(Debug, Clone)]
pub struct SearchContext {
    /// Platform whose suffixes and default locations apply
    pub os: HostOs,
    /// Directories searched in step 2, in order
    pub search_path: Vec<PathBuf>,
    /// Home directory for home-relative default locations
    pub home: Option<PathBuf>,
    /// Directory searched in step 4
    pub local_dir: Option<PathBuf>,
}

impl SearchContext {
    /// Snapshot the current process environment.
    #[must_use]
    pub fn from_env() -> Self {
        let search_path = std::env::var_os("PATH")
            .map(|raw| {
                std::env::split_paths(&raw)
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(|p| strip_quotes(&p))
                    .collect()
            })
            .unwrap_or_default();

        let local_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));

        Self {
            os: HostOs::current(),
            search_path,
            home: dirs::home_dir(),
            local_dir,
        }
    }

    /// Context that only searches the given directories.
    #[must_use]
    pub fn isolated(search_path: Vec<PathBuf>) -> Self {
        Self {
            os: HostOs::current(),
            search_path,
            home: None,
            local_dir: None,
        }
    }
}

fn strip_quotes(path: &Path) -> PathBuf {
    path.to_str().map_or_else(
        || path.to_path_buf(),
        |s| PathBuf::from(s.trim_matches('"')),
    )
}

/// Outcome of a lookup
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Executable located
    Found(ResolvedTool),
    /// Executable not located anywhere
    NotFound {
        /// Logical tool name
        tool: String,
        /// Absolute custom path that was given but does not exist
        rejected_custom: Option<PathBuf>,
    },
}

impl Resolution {
    /// The resolved tool, if found
    #[must_use]
    pub const fn found(&self) -> Option<&ResolvedTool> {
        match self {
            Self::Found(tool) => Some(tool),
            Self::NotFound { .. } => None,
        }
    }

    /// Returns true if the executable was located
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Executable resolver
#[derive(Debug, Clone)]
pub struct Resolver {
    context: SearchContext,
    locations: &'static [LocationEntry],
}

impl Resolver {
    /// Create a resolver over an explicit context and the built-in location table
    #[must_use]
    pub const fn new(context: SearchContext) -> Self {
        Self {
            context,
            locations: DEFAULT_LOCATIONS,
        }
    }

    /// Create a resolver for the current process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(SearchContext::from_env())
    }

    /// Replace the default-location table
    #[must_use]
    pub fn with_locations(mut self, locations: &'static [LocationEntry]) -> Self {
        self.locations = locations;
        self
    }

    /// The context this resolver searches
    #[must_use]
    pub const fn context(&self) -> &SearchContext {
        &self.context
    }

    /// Locate the executable for a tool.
    pub fn resolve(&self, descriptor: &'static ToolDescriptor, custom: Option<&Path>) -> Resolution {
        let found = |path: PathBuf, source: ResolutionSource| {
            debug!(tool = descriptor.name, path = %path.display(), %source, "resolved tool");
            Resolution::Found(ResolvedTool {
                descriptor,
                path,
                source,
            })
        };

        let mut rejected_custom = None;
        if let Some(custom) = custom {
            if is_present(custom) {
                return found(custom.to_path_buf(), ResolutionSource::Custom);
            }
            if custom.is_absolute() {
                warn!(
                    tool = descriptor.name,
                    path = %custom.display(),
                    "custom tool path does not exist, searching elsewhere"
                );
                rejected_custom = Some(custom.to_path_buf());
            } else {
                debug!(tool = descriptor.name, path = %custom.display(), "relative custom path not found");
            }
        }

        let suffixes = self.context.os.exe_suffixes();

        for dir in &self.context.search_path {
            if let Some(path) = with_suffixes(dir, descriptor.executable, suffixes) {
                return found(path, ResolutionSource::PathEnv);
            }
        }

        let defaults = candidates(
            self.locations,
            self.context.os,
            descriptor.executable,
            self.context.home.as_deref(),
        );
        if let Some(path) = defaults.into_iter().find(|p| is_present(p)) {
            return found(path, ResolutionSource::DefaultLocation);
        }

        if let Some(dir) = &self.context.local_dir {
            if let Some(path) = with_suffixes(dir, descriptor.executable, suffixes) {
                return found(path, ResolutionSource::LocalDir);
            }
        }

        debug!(tool = descriptor.name, "tool not found");
        Resolution::NotFound {
            tool: descriptor.name.to_string(),
            rejected_custom,
        }
    }
}

fn with_suffixes(dir: &Path, base: &str, suffixes: &[&str]) -> Option<PathBuf> {
    suffixes
        .iter()
        .map(|suffix| dir.join(format!("{base}{suffix}")))
        .find(|p| is_present(p))
}

fn is_present(path: &Path) -> bool {
    path.is_file()
}

/// Resolve every tool in the catalog, in catalog order.
#[must_use]
pub fn discover_all(resolver: &Resolver) -> Vec<(&'static ToolDescriptor, Resolution)> {
    CATALOG
        .iter()
        .map(|descriptor| (descriptor, resolver.resolve(descriptor, None)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use overseer_core::descriptor;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"").unwrap();
        path
    }

    fn capa() -> &'static ToolDescriptor {
        descriptor("Capa").unwrap()
    }

    fn only(dirs: &[&Path]) -> Resolver {
        let mut context = SearchContext::isolated(dirs.iter().map(|d| d.to_path_buf()).collect());
        context.os = HostOs::Linux;
        Resolver::new(context).with_locations(&[])
    }

    #[test]
    fn test_not_found_everywhere() {
        let empty = TempDir::new().unwrap();
        let resolver = only(&[empty.path()]);
        for tool in CATALOG {
            assert!(!resolver.resolve(tool, None).is_found(), "{}", tool.name);
        }
    }

    #[test]
    fn test_custom_path_wins() {
        let on_path = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        touch(on_path.path(), "capa");
        touch(on_path.path(), "capa.exe");
        let custom = touch(elsewhere.path(), "my-capa");

        let resolver = only(&[on_path.path()]);
        let resolution = resolver.resolve(capa(), Some(&custom));
        let tool = resolution.found().unwrap();
        assert_eq!(tool.path, custom);
        assert_eq!(tool.source, ResolutionSource::Custom);
    }

    #[test]
    fn test_missing_absolute_custom_falls_through() {
        let on_path = TempDir::new().unwrap();
        let expected = touch(on_path.path(), "capa.exe");
        touch(on_path.path(), "capa");

        let mut context = SearchContext::isolated(vec![on_path.path().to_path_buf()]);
        context.os = HostOs::Windows;
        let resolver = Resolver::new(context).with_locations(&[]);

        let missing = on_path.path().join("gone").join("capa.exe");
        let resolution = resolver.resolve(capa(), Some(&missing));
        let tool = resolution.found().unwrap();
        assert_eq!(tool.path, expected);
        assert_eq!(tool.source, ResolutionSource::PathEnv);
    }

    #[test]
    fn test_rejected_custom_is_recorded() {
        let empty = TempDir::new().unwrap();
        let resolver = only(&[empty.path()]);
        let missing = empty.path().join("capa-missing");

        match resolver.resolve(capa(), Some(&missing)) {
            Resolution::NotFound { tool, rejected_custom } => {
                assert_eq!(tool, "Capa");
                assert_eq!(rejected_custom, Some(missing));
            }
            Resolution::Found(t) => panic!("unexpected hit at {}", t.path.display()),
        }
    }

    #[test]
    fn test_search_path_order_and_suffixes() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let script = touch(first.path(), "capa.sh");
        touch(second.path(), "capa");

        let resolver = only(&[first.path(), second.path()]);

        assert_eq!(resolver.resolve(capa(), None).found().unwrap().path, script);
    }

    #[test]
    fn test_directories_are_not_executables() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("capa")).unwrap();
        assert!(!only(&[dir.path()]).resolve(capa(), None).is_found());
    }

    #[test]
    fn test_default_location_from_home() {
        let home = TempDir::new().unwrap();
        let tools = home.path().join("Desktop").join("Tools").join("capa");
        std::fs::create_dir_all(&tools).unwrap();
        let expected = touch(&tools, "capa");

        let context = SearchContext {
            os: HostOs::Linux,
            search_path: Vec::new(),
            home: Some(home.path().to_path_buf()),
            local_dir: None,
        };
        let resolution = Resolver::new(context).with_locations(DEFAULT_LOCATIONS).resolve(capa(), None);
        let tool = resolution.found().unwrap();
        assert_eq!(tool.source, ResolutionSource::DefaultLocation);
        assert_eq!(tool.path, expected);
    }

    #[test]
    fn test_local_dir_is_last_resort() {
        let local = TempDir::new().unwrap();
        let expected = touch(local.path(), "yara");

        let context = SearchContext {
            os: HostOs::Linux,
            search_path: Vec::new(),
            home: None,
            local_dir: Some(local.path().to_path_buf()),
        };
        let resolution = Resolver::new(context)
            .with_locations(&[])
            .resolve(descriptor("Yara").unwrap(), None);
        let tool = resolution.found().unwrap();
        assert_eq!(tool.source, ResolutionSource::LocalDir);
        assert_eq!(tool.path, expected);
    }

    #[test]
    fn test_resolution_sees_new_installs() {
        let dir = TempDir::new().unwrap();
        let resolver = only(&[dir.path()]);

        assert!(!resolver.resolve(capa(), None).is_found());
        touch(dir.path(), "capa");
        assert!(resolver.resolve(capa(), None).is_found());
    }

    #[test]
    fn test_discover_all_covers_catalog() {
        let empty = TempDir::new().unwrap();
        let resolver = only(&[empty.path()]);
        let all = discover_all(&resolver);
        assert_eq!(all.len(), CATALOG.len());
        assert_eq!(all[0].0.name, "Capa");
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes(Path::new("\"/opt/tools\"")), PathBuf::from("/opt/tools"));
    }
}
