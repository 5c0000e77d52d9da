//! overseer - malware-analysis tool orchestrator
//!
//! Runs a configured set of static and dynamic analysis tools against one
//! target binary and writes the collected results as reports.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    overseer_cli::run().await
}
