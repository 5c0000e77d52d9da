//! Run plan construction.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use overseer_core::tools::{PROCMON, PROCMON_CONFIG_FILE, TTD};
use overseer_core::{
    descriptor, AnalysisConfig, HarvestStrategy, PlannedInvocation, PlannedTarget, RunPlan, SkipReason,
    Suppression, TimeBudget, ToolCategory, ToolDescriptor, ToolStage, TARGET_INVOCATION,
};

use crate::resolver::{Resolution, Resolver};

/// Values substituted into argument templates
struct Placeholders {
    target: String,
    target_name: String,
    utils: String,
}

impl Placeholders {
    fn expand(&self, template: &str, output: Option<&Path>, output_dir: &Path) -> String {
        let mut arg = template
            .replace("{target_name}", &self.target_name)
            .replace("{target}", &self.target)
            .replace("{output_dir}", &output_dir.to_string_lossy())
            .replace("{utils}", &self.utils);
        if let Some(output) = output {
            arg = arg.replace("{output}", &output.to_string_lossy());
        }
        arg
    }
}

/// Build the run plan for a configuration.
///
/// Never fails: unknown or unavailable tools become skipped invocations, and
/// conflicting selections become suppressions. The same configuration and
/// filesystem state always yield the same plan.
#[must_use]
pub fn build_plan(config: &AnalysisConfig, resolver: &Resolver) -> RunPlan {
    let target = planned_target(config);
    let placeholders = Placeholders {
        target: target.staged.to_string_lossy().into_owned(),
        target_name: target.name(),
        utils: config.paths.utils.to_string_lossy().into_owned(),
    };
    let planner = Planner {
        config,
        resolver,
        placeholders,
    };

    let static_invocations: Vec<PlannedInvocation> = config
        .static_tools
        .enabled()
        .map(|name| planner.plan_tool(name, ToolCategory::Static))
        .collect();

    let mut suppressions = Vec::new();
    let procmon_active = config.procmon_requested();
    let ttd_requested = config.dynamic_tools.is_enabled(TTD);
    let ttd_active = ttd_requested && !procmon_active && config.binary.run;

    if ttd_requested && !ttd_active {
        let reason = if procmon_active {
            "TTD suppressed: Process Monitor selected"
        } else {
            "TTD suppressed: binary execution disabled"
        };
        info!(tool = TTD, reason, "suppressing tool");
        suppressions.push(Suppression {
            tool: TTD.to_string(),
            reason: reason.to_string(),
        });
    }

    let mut dynamic_invocations = Vec::new();
    let mut procmon_placed = false;
    for (name, enabled) in config.dynamic_tools.iter() {
        if name.eq_ignore_ascii_case(PROCMON) {
            if procmon_active && !procmon_placed {
                dynamic_invocations.push(planner.plan_procmon());
                procmon_placed = true;
            }
            continue;
        }
        if !enabled || (name.eq_ignore_ascii_case(TTD) && !ttd_active) {
            continue;
        }
        dynamic_invocations.push(planner.plan_tool(name, ToolCategory::Dynamic));
    }
    if procmon_active && !procmon_placed {
        dynamic_invocations.push(planner.plan_procmon());
    }
    if config.binary.run && !ttd_active {
        dynamic_invocations.push(planner.plan_target(&target));
    }

    debug!(
        static_count = static_invocations.len(),
        dynamic_count = dynamic_invocations.len(),
        suppressed = suppressions.len(),
        "run plan built"
    );

    RunPlan {
        target,
        static_invocations,
        dynamic_invocations,
        suppressions,
    }
}

fn planned_target(config: &AnalysisConfig) -> PlannedTarget {
    let file_name = config
        .binary
        .path
        .file_name()
        .map_or_else(|| PathBuf::from("target"), PathBuf::from);
    PlannedTarget {
        source: config.binary.path.clone(),
        staged: config.paths.binary.join(file_name),
        run: config.binary.run,
        as_admin: config.binary.as_admin,
        has_archive_password: config.binary.bin_pass.is_some(),
    }
}

struct Planner<'a> {
    config: &'a AnalysisConfig,
    resolver: &'a Resolver,
    placeholders: Placeholders,
}

impl Planner<'_> {
    fn plan_tool(&self, name: &str, category: ToolCategory) -> PlannedInvocation {
        match descriptor(name) {
            Some(tool) if tool.category == category => self.plan_descriptor(tool),
            Some(tool) => {
                let mut invocation = self.unknown(name, category);
                invocation.notes.push(format!("{} is a {} tool", tool.name, tool.category));
                invocation
            }
            None => self.unknown(name, category),
        }
    }

    fn unknown(&self, name: &str, category: ToolCategory) -> PlannedInvocation {
        debug!(tool = name, "unknown tool");
        let stage = match category {
            ToolCategory::Static => ToolStage::Static,
            ToolCategory::Dynamic => ToolStage::Monitor,
        };
        PlannedInvocation {
            tool: name.to_string(),
            category,
            stage,
            executable: None,
            source: None,
            args: Vec::new(),
            working_dir: self.config.paths.tool_output(&name.to_lowercase()),
            output_path: None,
            harvest: HarvestStrategy::Nothing,
            time_budget: None,
            elevate: false,
            skip: Some(SkipReason::UnknownTool),
            notes: Vec::new(),
        }
    }

    fn plan_descriptor(&self, tool: &'static ToolDescriptor) -> PlannedInvocation {
        let output_dir = self.config.paths.tool_output(&tool.output_dir_name());
        let output_path = tool.output_file_name().map(|f| output_dir.join(f));
        let args = tool
            .args
            .iter()
            .map(|a| self.placeholders.expand(a, output_path.as_deref(), &output_dir))
            .collect();

        let custom = self.config.tool_path(tool.name);
        let mut notes = Vec::new();
        let (executable, source, skip) = match self.resolver.resolve(tool, custom) {
            Resolution::Found(resolved) => (Some(resolved.path), Some(resolved.source), None),
            Resolution::NotFound { rejected_custom, .. } => {
                if let Some(path) = rejected_custom {
                    notes.push(format!("custom path {} does not exist", path.display()));
                }
                (None, None, Some(SkipReason::ToolNotFound))
            }
        };
        if let (Some(custom), Some(found)) = (custom, executable.as_deref()) {
            if custom != found {
                notes.push(format!("custom path {} does not exist", custom.display()));
            }
        }

        PlannedInvocation {
            tool: tool.name.to_string(),
            category: tool.category,
            stage: tool.stage,
            executable,
            source,
            args,
            working_dir: output_dir,
            output_path,
            harvest: tool.harvest,
            time_budget: None,
            elevate: tool.stage == ToolStage::Execute && self.config.binary.as_admin,
            skip,
            notes,
        }
    }

    fn plan_procmon(&self) -> PlannedInvocation {
        let mut invocation = self.plan_tool(PROCMON, ToolCategory::Dynamic);
        let settings = self.config.procmon_settings;
        invocation.time_budget = Some(TimeBudget {
            seconds: settings.duration,
            timer_disabled: settings.disable_timer,
        });

        let saved_config = self.config.paths.utils.join(PROCMON_CONFIG_FILE);
        if saved_config.is_file() {
            invocation.args.push("/LoadConfig".to_string());
            invocation.args.push(saved_config.to_string_lossy().into_owned());
        }
        invocation
    }

    fn plan_target(&self, target: &PlannedTarget) -> PlannedInvocation {
        PlannedInvocation {
            tool: TARGET_INVOCATION.to_string(),
            category: ToolCategory::Dynamic,
            stage: ToolStage::Execute,
            executable: Some(target.staged.clone()),
            source: None,
            args: Vec::new(),
            working_dir: self.config.paths.tool_output(&TARGET_INVOCATION.to_lowercase()),
            output_path: None,
            harvest: HarvestStrategy::StdoutText,
            time_budget: None,
            elevate: target.as_admin,
            skip: None,
            notes: Vec::new(),
        }
    }
}
