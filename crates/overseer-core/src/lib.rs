//! Core types and errors for the overseer analysis orchestrator.
//!
//! This crate provides the foundational types shared by every other crate:
//!
//! - **Tools**: the built-in [`CATALOG`] of analysis utilities and their launch templates
//! - **Config**: the declarative [`AnalysisConfig`] a run is started from
//! - **Plan**: the validated [`RunPlan`] derived from a config
//! - **Result**: the [`AnalysisResult`] aggregate handed to report rendering
//! - **Errors**: the run-level error taxonomy in [`OverseerError`]
//!
//! # Example
//!
//! ```rust,ignore
//! use overseer_core::{AnalysisConfig, Result};
//!
//! fn enabled_static(path: &std::path::Path) -> Result<Vec<String>> {
//!     let config = AnalysisConfig::load(path)?;
//!     Ok(config.static_tools.enabled().map(str::to_string).collect())
//! }
//! ```

mod error;
pub mod tools;
pub mod types;

pub use error::{OverseerError, Result};
pub use tools::{descriptor, CATALOG, TARGET_INVOCATION};
pub use types::*;
