//! Run plan execution.
//!
//! Static invocations run concurrently under a worker pool. Dynamic
//! invocations follow a fixed sequence:
//!
//! 1. `prepare` tools run to completion, one at a time
//! 2. `monitor` tools are launched (Process Monitor among them)
//! 3. `execute` invocations are launched (the target, or TTD)
//! 4. the session lasts until every execute invocation has ended and a timed
//!    Process Monitor capture has used its budget
//! 5. monitors still running are stopped
//!
//! Individual tool failures are recorded and never abort the run. Only
//! directory setup and target staging errors are returned.

use chrono::Utc;
use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use overseer_core::tools::PROCMON;
use overseer_core::{
    AnalysisResult, AnalysisStatus, InvocationStatus, OverseerError, PlannedInvocation, ProcmonReport, Result,
    RunPlan, SkipReason, SkipRecord, StopReason, ToolOutcome, ToolStage, WorkPaths,
};

use crate::harvest::harvest;
use crate::launcher::{LaunchOptions, Launcher, ProcessHandle, ProcessOutput};
use crate::staging::{prepare_directories, stage_target};

/// Capacity of the status channel.
const STATUS_CAPACITY: usize = 256;

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Static invocations allowed to run at once
    pub max_parallel: usize,
    /// Hard ceiling for a static tool
    pub static_ceiling: Duration,
    /// Hard ceiling for prepare and execute invocations
    pub dynamic_ceiling: Duration,
    /// Process launcher settings
    pub launch: LaunchOptions,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            max_parallel: 4,
            static_ceiling: Duration::from_secs(30 * 60),
            dynamic_ceiling: Duration::from_secs(10 * 60),
            launch: LaunchOptions::default(),
        }
    }
}

/// Stage of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Creating directories and staging the target
    Setup,
    /// Running static tools
    Static,
    /// Running dynamic tools
    Dynamic,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Setup => write!(f, "setup"),
            Self::Static => write!(f, "static"),
            Self::Dynamic => write!(f, "dynamic"),
        }
    }
}

/// Progress notification published while a run is in flight
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum StatusEvent {
    /// A phase began
    PhaseStarted {
        /// The phase
        phase: Phase,
    },
    /// A process was started
    Launched {
        /// Tool name
        tool: String,
        /// OS process id
        pid: Option<u32>,
    },
    /// An invocation reached a terminal state
    Finished {
        /// Tool name
        tool: String,
        /// Terminal status
        status: InvocationStatus,
    },
    /// An invocation was not launched
    Skipped {
        /// Tool name
        tool: String,
        /// Why
        reason: SkipReason,
    },
    /// A stop was requested
    StopRequested,
    /// The run finished
    Completed {
        /// Overall verdict
        status: AnalysisStatus,
    },
}

impl std::fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PhaseStarted { phase } => write!(f, "{phase} phase started"),
            Self::Launched { tool, pid: Some(pid) } => write!(f, "{tool} launched (pid {pid})"),
            Self::Launched { tool, pid: None } => write!(f, "{tool} launched"),
            Self::Finished { tool, status } => write!(f, "{tool} {status}"),
            Self::Skipped { tool, reason } => write!(f, "{tool} skipped ({reason})"),
            Self::StopRequested => write!(f, "stop requested"),
            Self::Completed { status } => write!(f, "analysis {status}"),
        }
    }
}

/// Cloneable handle for stopping a run from elsewhere
#[derive(Debug, Clone)]
pub struct StopHandle {
    token: CancellationToken,
    events: broadcast::Sender<StatusEvent>,
}

impl StopHandle {
    /// Ask the run to stop.
    ///
    /// Nothing new is launched afterwards; running processes are killed and
    /// results collected so far are kept.
    pub fn request_stop(&self) {
        if !self.token.is_cancelled() {
            info!("stop requested");
            let _ = self.events.send(StatusEvent::StopRequested);
            self.token.cancel();
        }
    }

    /// Returns true once a stop has been requested
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// A launched dynamic invocation and its position in the plan
struct Live<'p> {
    index: usize,
    invocation: &'p PlannedInvocation,
    handle: ProcessHandle,
}

/// Outcomes keyed by plan position
type Accumulator = Mutex<Vec<(usize, ToolOutcome)>>;

/// Drives a run plan to an analysis result
pub struct Orchestrator {
    launcher: Launcher,
    options: OrchestratorOptions,
    token: CancellationToken,
    events: broadcast::Sender<StatusEvent>,
}

impl Orchestrator {
    /// Create an orchestrator
    #[must_use]
    pub fn new(options: OrchestratorOptions) -> Self {
        let (events, _) = broadcast::channel(STATUS_CAPACITY);
        Self {
            launcher: Launcher::new(options.launch.clone()),
            options,
            token: CancellationToken::new(),
            events,
        }
    }

    /// Subscribe to status events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.events.subscribe()
    }

    /// Handle that stops this orchestrator's run
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            token: self.token.clone(),
            events: self.events.clone(),
        }
    }

    /// Request a stop; same as [`StopHandle::request_stop`]
    pub fn request_stop(&self) {
        self.stop_handle().request_stop();
    }

    fn emit(&self, event: StatusEvent) {
        let _ = self.events.send(event);
    }

    /// Execute a plan.
    ///
    /// # Errors
    ///
    /// Returns `DirectorySetupFailed` or `BinaryStagingFailed` before anything
    /// is launched. Tool failures are reported inside the result.
    pub async fn run(&self, plan: &RunPlan, paths: &WorkPaths) -> Result<AnalysisResult> {
        let started_at = Utc::now();

        self.emit(StatusEvent::PhaseStarted { phase: Phase::Setup });
        prepare_directories(paths, plan).await.map_err(OverseerError::from)?;
        let binary = stage_target(&plan.target).await.map_err(OverseerError::from)?;
        info!(binary = %binary.name, sha256 = %binary.sha256, "target staged");

        let outcomes: Accumulator = Mutex::new(Vec::with_capacity(plan.len()));

        self.emit(StatusEvent::PhaseStarted { phase: Phase::Static });
        self.run_static(plan, &outcomes).await;

        self.emit(StatusEvent::PhaseStarted { phase: Phase::Dynamic });
        self.run_dynamic(plan, plan.static_invocations.len(), &outcomes).await;

        let mut outcomes = outcomes.into_inner();
        outcomes.sort_by_key(|(index, _)| *index);
        let mut outcomes: Vec<ToolOutcome> = outcomes.into_iter().map(|(_, o)| o).collect();
        let dynamic_results = outcomes.split_off(plan.static_invocations.len());
        let static_results = outcomes;

        let status = AnalysisStatus::from_outcomes(static_results.iter().chain(dynamic_results.iter()));
        let skipped = static_results
            .iter()
            .chain(dynamic_results.iter())
            .filter_map(|o| {
                o.skip_reason.map(|reason| SkipRecord {
                    tool: o.tool.clone(),
                    reason,
                })
            })
            .collect();

        let (procmon_outcomes, dynamic_results): (Vec<_>, Vec<_>) = dynamic_results
            .into_iter()
            .partition(|o| o.tool.eq_ignore_ascii_case(PROCMON));
        let procmon = procmon_outcomes.into_iter().next().map(|outcome| {
            let budget = plan.invocation(PROCMON).and_then(|i| i.time_budget);
            ProcmonReport {
                duration_secs: budget.map_or(0, |b| b.seconds),
                timer_disabled: budget.is_some_and(|b| b.timer_disabled),
                outcome,
            }
        });

        info!(%status, "analysis finished");
        self.emit(StatusEvent::Completed { status });

        Ok(AnalysisResult {
            binary,
            status,
            started_at,
            finished_at: Utc::now(),
            static_results,
            dynamic_results,
            procmon,
            suppressions: plan.suppressions.clone(),
            skipped,
        })
    }

    async fn run_static(&self, plan: &RunPlan, outcomes: &Accumulator) {
        let semaphore = Arc::new(Semaphore::new(self.options.max_parallel.max(1)));
        let ceiling = self.options.static_ceiling;

        let tasks = plan.static_invocations.iter().enumerate().map(|(index, invocation)| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let outcome = match semaphore.acquire().await {
                    Ok(_permit) => self.run_to_completion(invocation, ceiling).await,
                    Err(_) => self.skip(invocation, SkipReason::Cancelled),
                };
                outcomes.lock().await.push((index, outcome));
            }
        });
        join_all(tasks).await;
    }

    async fn run_dynamic(&self, plan: &RunPlan, offset: usize, outcomes: &Accumulator) {
        let ceiling = self.options.dynamic_ceiling;
        let by_stage = |stage: ToolStage| {
            plan.dynamic_invocations
                .iter()
                .enumerate()
                .filter(move |(_, i)| i.stage == stage)
                .map(move |(index, i)| (offset + index, i))
        };

        for (index, invocation) in by_stage(ToolStage::Prepare) {
            let outcome = self.run_to_completion(invocation, ceiling).await;
            outcomes.lock().await.push((index, outcome));
        }

        let mut monitors = Vec::new();
        let mut drivers = Vec::new();
        for (index, invocation) in by_stage(ToolStage::Monitor).chain(by_stage(ToolStage::Execute)) {
            match self.start(invocation) {
                Ok(handle) => {
                    let live = Live {
                        index,
                        invocation,
                        handle,
                    };
                    if is_driver(invocation) {
                        drivers.push(live);
                    } else {
                        monitors.push(live);
                    }
                }
                Err(outcome) => outcomes.lock().await.push((index, outcome)),
            }
        }

        let driven = join_all(drivers.into_iter().map(|live| self.drive(live, ceiling))).await;
        for live in driven {
            let outcome = self.collect(live.invocation, live.handle).await;
            outcomes.lock().await.push((live.index, outcome));
        }

        for mut live in monitors {
            live.handle.kill(StopReason::SessionEnded).await;
            let outcome = self.collect(live.invocation, live.handle).await;
            outcomes.lock().await.push((live.index, outcome));
        }
    }

    /// Wait for a driver invocation to end.
    async fn drive<'p>(&self, mut live: Live<'p>, ceiling: Duration) -> Live<'p> {
        match live.invocation.time_budget {
            Some(budget) => match budget.deadline() {
                Some(limit) => {
                    tokio::select! {
                        _ = live.handle.wait(None) => {}
                        () = tokio::time::sleep(limit) => {
                            info!(tool = %live.invocation.tool, seconds = budget.seconds, "capture budget elapsed");
                            live.handle.kill(StopReason::BudgetElapsed).await;
                        }
                        () = self.token.cancelled() => {
                            live.handle.kill(StopReason::StopRequested).await;
                        }
                    }
                }
                None => {
                    tokio::select! {
                        _ = live.handle.wait(None) => {}
                        () = self.token.cancelled() => {
                            live.handle.kill(StopReason::SessionEnded).await;
                        }
                    }
                }
            },
            None => {
                tokio::select! {
                    _ = live.handle.wait(Some(ceiling)) => {}
                    () = self.token.cancelled() => {
                        live.handle.kill(StopReason::StopRequested).await;
                    }
                }
            }
        }
        live
    }

    async fn run_to_completion(&self, invocation: &PlannedInvocation, ceiling: Duration) -> ToolOutcome {
        let mut handle = match self.start(invocation) {
            Ok(handle) => handle,
            Err(outcome) => return outcome,
        };
        tokio::select! {
            _ = handle.wait(Some(ceiling)) => {}
            () = self.token.cancelled() => {
                handle.kill(StopReason::StopRequested).await;
            }
        }
        self.collect(invocation, handle).await
    }

    /// Launch an invocation, or produce its outcome when it cannot be launched.
    fn start(&self, invocation: &PlannedInvocation) -> std::result::Result<ProcessHandle, ToolOutcome> {
        if let Some(reason) = invocation.skip {
            return Err(self.skip(invocation, reason));
        }
        if self.token.is_cancelled() {
            return Err(self.skip(invocation, SkipReason::Cancelled));
        }

        match self.launcher.launch(invocation) {
            Ok(handle) => {
                self.emit(StatusEvent::Launched {
                    tool: invocation.tool.clone(),
                    pid: handle.pid(),
                });
                Ok(handle)
            }
            Err(e) => {
                warn!(tool = %invocation.tool, error = %e, "launch failed");
                let mut outcome = ToolOutcome::skipped(
                    &invocation.tool,
                    invocation.category,
                    invocation.stage,
                    SkipReason::ToolNotFound,
                );
                outcome.status = InvocationStatus::Failed;
                outcome.skip_reason = None;
                outcome.executable.clone_from(&invocation.executable);
                outcome.args.clone_from(&invocation.args);
                outcome.error = Some(e.to_string());
                self.emit(StatusEvent::Finished {
                    tool: invocation.tool.clone(),
                    status: InvocationStatus::Failed,
                });
                Err(outcome)
            }
        }
    }

    fn skip(&self, invocation: &PlannedInvocation, reason: SkipReason) -> ToolOutcome {
        debug!(tool = %invocation.tool, %reason, "skipping");
        self.emit(StatusEvent::Skipped {
            tool: invocation.tool.clone(),
            reason,
        });
        ToolOutcome::skipped(&invocation.tool, invocation.category, invocation.stage, reason)
    }

    async fn collect(&self, invocation: &PlannedInvocation, handle: ProcessHandle) -> ToolOutcome {
        let output = handle.finish().await;
        let payload = harvest(
            invocation.harvest,
            invocation.output_path.as_deref(),
            &output.stdout,
            self.options.launch.output_cap,
        )
        .await;

        self.emit(StatusEvent::Finished {
            tool: invocation.tool.clone(),
            status: output.status,
        });

        let error = output.error.clone().or_else(|| failure_message(invocation, &output, &self.options));
        let stderr = (!output.stderr.is_blank()).then(|| output.stderr.text());
        let duration_ms = u64::try_from(output.elapsed.as_millis()).unwrap_or(u64::MAX);

        ToolOutcome {
            tool: invocation.tool.clone(),
            category: invocation.category,
            stage: invocation.stage,
            status: output.status,
            stop_reason: output.stop_reason,
            skip_reason: None,
            executable: invocation.executable.clone(),
            args: invocation.args.clone(),
            pid: output.pid,
            exit_code: output.exit_code,
            started_at: Some(output.started_at),
            finished_at: Some(output.finished_at),
            duration_ms: Some(duration_ms),
            payload,
            stderr,
            error,
        }
    }
}

/// Invocations whose end marks the end of the capture session
fn is_driver(invocation: &PlannedInvocation) -> bool {
    invocation.stage == ToolStage::Execute || invocation.time_budget.is_some()
}

fn failure_message(
    invocation: &PlannedInvocation,
    output: &ProcessOutput,
    options: &OrchestratorOptions,
) -> Option<String> {
    let tool = invocation.tool.clone();
    match output.status {
        InvocationStatus::Failed => Some(
            OverseerError::InvocationFailed {
                tool,
                code: output.exit_code,
            }
            .to_string(),
        ),
        InvocationStatus::TimedOut => {
            let ceiling = if invocation.stage == ToolStage::Static {
                options.static_ceiling
            } else {
                options.dynamic_ceiling
            };
            Some(
                OverseerError::InvocationTimedOut {
                    tool,
                    seconds: ceiling.as_secs(),
                }
                .to_string(),
            )
        }
        _ => None,
    }
}
