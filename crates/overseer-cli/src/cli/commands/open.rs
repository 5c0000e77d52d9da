//! `overseer open` - Open a report or the reports directory.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::cli::args::OpenArgs;
use crate::config::expand;

pub async fn execute(ctx: Context, args: OpenArgs) -> Result<()> {
    let path = match &args.path {
        Some(path) => expand(path),
        None => ctx.load_config()?.paths.reports(),
    };

    anyhow::ensure!(path.exists(), "Nothing to open: {} does not exist", path.display());

    ::open::that(&path)?;
    println!("{} {}", "Opened".green(), path.display());
    Ok(())
}
