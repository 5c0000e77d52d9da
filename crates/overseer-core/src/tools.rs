//! Built-in table of analysis tools.
//!
//! Argument templates may contain these placeholders, expanded when a run plan
//! is built:
//!
//! | placeholder     | expands to                                        |
//! |-----------------|---------------------------------------------------|
//! | `{target}`      | staged copy of the target binary                  |
//! | `{target_name}` | file name of the staged target                    |
//! | `{output}`      | side file the tool writes (`<output_dir>/<exe>.<ext>`) |
//! | `{output_dir}`  | per-tool directory under the analysis directory   |
//! | `{utils}`       | utilities directory                               |
//!
//! Adding a tool means adding an entry here (and default locations in the
//! engine's location table); nothing else changes.

use crate::types::{HarvestStrategy, ToolCategory, ToolDescriptor, ToolStage};

/// Logical name of the invocation that executes the target itself.
pub const TARGET_INVOCATION: &str = "Target";

const fn static_tool(
    name: &'static str,
    executable: &'static str,
    args: &'static [&'static str],
    harvest: HarvestStrategy,
) -> ToolDescriptor {
    ToolDescriptor {
        name,
        executable,
        category: ToolCategory::Static,
        stage: ToolStage::Static,
        args,
        harvest,
    }
}

const fn dynamic_tool(
    name: &'static str,
    executable: &'static str,
    stage: ToolStage,
    args: &'static [&'static str],
    harvest: HarvestStrategy,
) -> ToolDescriptor {
    ToolDescriptor {
        name,
        executable,
        category: ToolCategory::Dynamic,
        stage,
        args,
        harvest,
    }
}

/// Every tool overseer knows how to launch, static tools first.
pub const CATALOG: &[ToolDescriptor] = &[
    // Static analysis
    static_tool("Capa", "capa", &["-j", "{target}"], HarvestStrategy::StdoutJson),
    static_tool(
        "Yara",
        "yara",
        &["-s", "-r", "{utils}/rules.yar", "{target}"],
        HarvestStrategy::StdoutText,
    ),
    static_tool("Exiftool", "exiftool", &["-json", "{target}"], HarvestStrategy::StdoutJson),
    static_tool("Detect-it-Easy", "die", &["-j", "{target}"], HarvestStrategy::StdoutJson),
    static_tool("Floss", "floss", &["-j", "{target}"], HarvestStrategy::StdoutJson),
    static_tool(
        "ResourceExtract",
        "resourcehacker",
        &["-open", "{target}", "-save", "{output}", "-action", "extract", "-mask", ",,"],
        HarvestStrategy::SideFileText { extension: "rc" },
    ),
    static_tool("Binwalk", "binwalk", &["{target}"], HarvestStrategy::StdoutText),
    // Dynamic analysis
    dynamic_tool("Fakenet", "fakenet", ToolStage::Monitor, &[], HarvestStrategy::StdoutText),
    dynamic_tool(
        "ProcDump",
        "procdump",
        ToolStage::Monitor,
        &["-accepteula", "-ma", "-w", "{target_name}", "{output_dir}"],
        HarvestStrategy::StdoutText,
    ),
    dynamic_tool("Autoclicker", "autoclicker", ToolStage::Monitor, &[], HarvestStrategy::Nothing),
    dynamic_tool(
        "CaptureFiles",
        "capturefiles",
        ToolStage::Monitor,
        &["{output_dir}"],
        HarvestStrategy::StdoutText,
    ),
    dynamic_tool(
        "Screenshots",
        "screenshots",
        ToolStage::Monitor,
        &["{output_dir}"],
        HarvestStrategy::StdoutText,
    ),
    dynamic_tool(
        "RandomizeNames",
        "randomizenames",
        ToolStage::Prepare,
        &["{target}"],
        HarvestStrategy::StdoutText,
    ),
    dynamic_tool(
        "TTD",
        "ttd",
        ToolStage::Execute,
        &["-out", "{output}", "-launch", "{target}"],
        HarvestStrategy::SideFileArtifact { extension: "run" },
    ),
    dynamic_tool(
        "Procmon",
        "procmon",
        ToolStage::Monitor,
        &["/BackingFile", "{output}", "/Quiet", "/Minimized"],
        HarvestStrategy::SideFileArtifact { extension: "pml" },
    ),
];

/// Look up a tool by its logical name (case-insensitive).
#[must_use]
pub fn descriptor(name: &str) -> Option<&'static ToolDescriptor> {
    CATALOG.iter().find(|d| d.name.eq_ignore_ascii_case(name))
}

/// Process Monitor's logical name.
pub const PROCMON: &str = "Procmon";

/// Time-Travel-Debugging's logical name.
pub const TTD: &str = "TTD";

/// Saved Process Monitor filter configuration, looked up in the utilities directory.
pub const PROCMON_CONFIG_FILE: &str = "procmon.pmc";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(descriptor("capa").map(|d| d.name), Some("Capa"));
        assert_eq!(descriptor("PROCMON").map(|d| d.executable), Some("procmon"));
        assert!(descriptor("ghidra").is_none());
    }

    #[test]
    fn test_names_are_unique() {
        for (i, a) in CATALOG.iter().enumerate() {
            for b in &CATALOG[i + 1..] {
                assert!(!a.name.eq_ignore_ascii_case(b.name), "duplicate {}", a.name);
            }
        }
    }

    #[test]
    fn test_category_matches_stage() {
        for tool in CATALOG {
            assert_eq!(tool.category, tool.stage.category(), "{}", tool.name);
        }
    }

    #[test]
    fn test_side_file_tools_reference_output() {
        for tool in CATALOG {
            if tool.output_file_name().is_some() {
                assert!(tool.args.contains(&"{output}"), "{} never writes its side file", tool.name);
            }
        }
    }

    #[test]
    fn test_procmon_template() {
        let procmon = descriptor(PROCMON).unwrap();
        assert_eq!(procmon.args, &["/BackingFile", "{output}", "/Quiet", "/Minimized"]);
        assert_eq!(procmon.output_file_name().as_deref(), Some("procmon.pml"));
        assert_eq!(procmon.stage, ToolStage::Monitor);
    }
}
