//! # overseer-cli
//!
//! Command-line front-end for the overseer analysis orchestrator.
//!
//! ## Features
//!
//! - **Analysis runs**: plan, launch and harvest every configured tool
//! - **Dry runs**: print the run plan without launching anything
//! - **Tool discovery**: show where each known tool resolves on this host
//! - **Reports**: JSON, Markdown and HTML, re-renderable from saved results
//! - **Multiple output formats**: Pretty tables, JSON, CSV, YAML

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
