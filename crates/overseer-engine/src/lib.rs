//! Analysis engine for overseer.
//!
//! Turns an [`AnalysisConfig`](overseer_core::AnalysisConfig) into a
//! [`RunPlan`](overseer_core::RunPlan), then drives the external tools in
//! that plan and collects an [`AnalysisResult`](overseer_core::AnalysisResult).
//!
//! ```no_run
//! use overseer_core::AnalysisConfig;
//! use overseer_engine::{build_plan, Orchestrator, OrchestratorOptions, Resolver};
//!
//! # async fn example() -> overseer_core::Result<()> {
//! let config = AnalysisConfig::load("overseer.json".as_ref())?;
//! let plan = build_plan(&config, &Resolver::from_env());
//!
//! let orchestrator = Orchestrator::new(OrchestratorOptions::default());
//! let result = orchestrator.run(&plan, &config.paths).await?;
//! println!("{}", result.status);
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/overseer-engine/0.3.0")]

mod error;
mod harvest;
pub mod launcher;
pub mod locations;
pub mod orchestrator;
mod planner;
pub mod resolver;
pub mod staging;

pub use error::{EngineError, EngineResult};
pub use harvest::harvest;
pub use launcher::{Captured, LaunchOptions, Launcher, ProcessHandle, ProcessOutput};
pub use locations::HostOs;
pub use orchestrator::{Orchestrator, OrchestratorOptions, Phase, StatusEvent, StopHandle};
pub use planner::build_plan;
pub use resolver::{discover_all, Resolution, Resolver, SearchContext};
