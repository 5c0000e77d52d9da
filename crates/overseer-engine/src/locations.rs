//! Per-platform default install locations for analysis tools.
//!
//! The table is plain data keyed by (platform, executable). Resolution walks
//! the candidates in order; nothing here touches the filesystem.

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Host platform, as far as tool lookup cares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostOs {
    /// Microsoft Windows
    Windows,
    /// Apple macOS
    MacOs,
    /// Linux
    Linux,
    /// Anything else (no default locations)
    Other,
}

impl HostOs {
    /// Platform this process is running on
    #[must_use]
    pub fn current() -> Self {
        Self::from_name(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value to a platform
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "windows" => Self::Windows,
            "macos" => Self::MacOs,
            "linux" => Self::Linux,
            _ => Self::Other,
        }
    }

    /// Suffixes tried after an executable's base name, in order
    #[must_use]
    pub const fn exe_suffixes(self) -> &'static [&'static str] {
        match self {
            Self::Windows => &[".exe", ".bat"],
            _ => &["", ".sh"],
        }
    }
}

impl std::fmt::Display for HostOs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Windows => write!(f, "windows"),
            Self::MacOs => write!(f, "macos"),
            Self::Linux => write!(f, "linux"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// One candidate location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate {
    /// Fixed path
    Absolute(&'static str),
    /// Path relative to the user's home directory, one component per element
    Home(&'static [&'static str]),
}

impl Candidate {
    /// Concrete path for this candidate; `None` for home-relative paths without a home.
    #[must_use]
    pub fn to_path(&self, home: Option<&Path>) -> Option<PathBuf> {
        match self {
            Self::Absolute(path) => Some(PathBuf::from(path)),
            Self::Home(components) => home.map(|h| components.iter().fold(h.to_path_buf(), |p, c| p.join(c))),
        }
    }
}

/// Candidate paths for one executable on one platform
#[derive(Debug, Clone, Copy)]
pub struct LocationEntry {
    /// Platform the entry applies to
    pub os: HostOs,
    /// Executable base name, as in the tool catalog
    pub executable: &'static str,
    /// Candidates in search order
    pub candidates: &'static [Candidate],
}

use Candidate::{Absolute, Home};

const fn entry(os: HostOs, executable: &'static str, candidates: &'static [Candidate]) -> LocationEntry {
    LocationEntry {
        os,
        executable,
        candidates,
    }
}

/// Built-in default-location table.
pub const DEFAULT_LOCATIONS: &[LocationEntry] = &[
    // Windows
    entry(HostOs::Windows, "capa", &[
        Absolute(r"C:\Program Files\capa\capa.exe"),
        Absolute(r"C:\Tools\capa\capa.exe"),
        Home(&["Desktop", "Tools", "capa", "capa.exe"]),
    ]),
    entry(HostOs::Windows, "yara", &[
        Absolute(r"C:\Program Files\yara\yara64.exe"),
        Absolute(r"C:\Tools\yara\yara64.exe"),
        Home(&["Desktop", "Tools", "yara", "yara64.exe"]),
    ]),
    entry(HostOs::Windows, "exiftool", &[
        Absolute(r"C:\Program Files\exiftool\exiftool.exe"),
        Absolute(r"C:\Tools\exiftool\exiftool.exe"),
        Home(&["Desktop", "Tools", "exiftool", "exiftool.exe"]),
    ]),
    entry(HostOs::Windows, "die", &[
        Absolute(r"C:\Program Files\DIE\die.exe"),
        Absolute(r"C:\Tools\DIE\die.exe"),
        Home(&["Desktop", "Tools", "DIE", "die.exe"]),
        Home(&["Desktop", "Tools", "Detect-it-Easy", "die.exe"]),
    ]),
    entry(HostOs::Windows, "floss", &[
        Absolute(r"C:\Program Files\floss\floss.exe"),
        Absolute(r"C:\Tools\floss\floss.exe"),
        Home(&["Desktop", "Tools", "floss", "floss.exe"]),
    ]),
    entry(HostOs::Windows, "resourcehacker", &[
        Absolute(r"C:\Program Files\Resource Hacker\ResourceHacker.exe"),
        Absolute(r"C:\Tools\ResourceHacker\ResourceHacker.exe"),
        Home(&["Desktop", "Tools", "ResourceHacker", "ResourceHacker.exe"]),
    ]),
    entry(HostOs::Windows, "binwalk", &[
        Absolute(r"C:\Program Files\binwalk\binwalk.exe"),
        Absolute(r"C:\Tools\binwalk\binwalk.exe"),
        Home(&["Desktop", "Tools", "binwalk", "binwalk.exe"]),
    ]),
    entry(HostOs::Windows, "fakenet", &[
        Absolute(r"C:\Program Files\FakeNet-NG\fakenet.exe"),
        Absolute(r"C:\Tools\FakeNet-NG\fakenet.exe"),
        Home(&["Desktop", "Tools", "FakeNet-NG", "fakenet.exe"]),
    ]),
    entry(HostOs::Windows, "procdump", &[
        Absolute(r"C:\Program Files\SysinternalsSuite\procdump.exe"),
        Absolute(r"C:\Tools\SysinternalsSuite\procdump.exe"),
        Absolute(r"C:\Tools\procdump\procdump.exe"),
        Home(&["Desktop", "Tools", "SysinternalsSuite", "procdump.exe"]),
    ]),
    entry(HostOs::Windows, "procmon", &[
        Absolute(r"C:\Program Files\SysinternalsSuite\Procmon.exe"),
        Absolute(r"C:\Tools\SysinternalsSuite\Procmon.exe"),
        Absolute(r"C:\Tools\Procmon\Procmon.exe"),
        Home(&["Desktop", "Tools", "SysinternalsSuite", "Procmon.exe"]),
    ]),
    entry(HostOs::Windows, "ttd", &[
        Absolute(r"C:\Program Files\Windows Kits\10\Debuggers\x64\TTD\TTD.exe"),
        Absolute(r"C:\Tools\TTD\TTD.exe"),
        Home(&["Desktop", "Tools", "TTD", "TTD.exe"]),
    ]),
    // macOS
    entry(HostOs::MacOs, "capa", &[
        Absolute("/usr/local/bin/capa"),
        Absolute("/opt/homebrew/bin/capa"),
        Home(&["Desktop", "Tools", "capa", "capa"]),
    ]),
    entry(HostOs::MacOs, "yara", &[
        Absolute("/usr/local/bin/yara"),
        Absolute("/opt/homebrew/bin/yara"),
        Home(&["Desktop", "Tools", "yara", "yara"]),
    ]),
    entry(HostOs::MacOs, "exiftool", &[
        Absolute("/usr/local/bin/exiftool"),
        Absolute("/opt/homebrew/bin/exiftool"),
        Home(&["Desktop", "Tools", "exiftool", "exiftool"]),
    ]),
    entry(HostOs::MacOs, "binwalk", &[
        Absolute("/usr/local/bin/binwalk"),
        Absolute("/opt/homebrew/bin/binwalk"),
        Home(&["Desktop", "Tools", "binwalk", "binwalk"]),
    ]),
    // Linux
    entry(HostOs::Linux, "capa", &[
        Absolute("/usr/local/bin/capa"),
        Absolute("/usr/bin/capa"),
        Home(&["Desktop", "Tools", "capa", "capa"]),
    ]),
    entry(HostOs::Linux, "yara", &[
        Absolute("/usr/local/bin/yara"),
        Absolute("/usr/bin/yara"),
        Home(&["Desktop", "Tools", "yara", "yara"]),
    ]),
    entry(HostOs::Linux, "exiftool", &[
        Absolute("/usr/local/bin/exiftool"),
        Absolute("/usr/bin/exiftool"),
        Home(&["Desktop", "Tools", "exiftool", "exiftool"]),
    ]),
    entry(HostOs::Linux, "binwalk", &[
        Absolute("/usr/local/bin/binwalk"),
        Absolute("/usr/bin/binwalk"),
        Home(&["Desktop", "Tools", "binwalk", "binwalk"]),
    ]),
];

/// Candidate paths for an executable on a platform, in search order.
#[must_use]
pub fn candidates(
    table: &[LocationEntry],
    os: HostOs,
    executable: &str,
    home: Option<&Path>,
) -> Vec<PathBuf> {
    table
        .iter()
        .filter(|e| e.os == os && e.executable.eq_ignore_ascii_case(executable))
        .flat_map(|e| e.candidates.iter())
        .filter_map(|c| c.to_path(home))
        .collect()
}
