//! One-shot mirror download.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::{GlobalArgs, build_service};
use crate::output;

#[derive(Args)]
pub struct RefreshArgs {
    /// Output the refresh report as JSON
    #[arg(long)]
    pub json: bool
}

pub async fn run(global: &GlobalArgs, args: RefreshArgs) -> Result<()> {
    let config = global.load_config()?;
    let service = build_service(&config)?;

    let report = service.refresh(&config.owner).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    output::header(&format!("Repositories of {}", config.owner));
    println!();
    output::repo_table(&report.mirror);
    println!();

    for error in &report.errors {
        output::warn(&format!(
            "{}: could not read {} ({})",
            error.repository, error.path, error.error
        ));
    }

    output::success(&format!(
        "Saved {} repositories to {}",
        report.repositories.to_string().bold(),
        config.snapshot_path.display()
    ));
    if report.has_errors() {
        output::hint("Files that failed to load were treated as absent");
    }

    Ok(())
}
