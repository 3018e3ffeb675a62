//! Apply command - writes one edited record back to GitHub.
//!
//! The edit file holds a single JSON object with `name`, `description`,
//! `file_presence`, `category` and `tags`, the same shape `POST /update`
//! accepts. The record is compared against the saved snapshot, so run
//! `refresh` first.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use repo_sync::{EditRequest, ReconcileOutcome};
use std::path::{Path, PathBuf};

use super::{GlobalArgs, build_service};
use crate::output;

#[derive(Args)]
pub struct ApplyArgs {
    /// JSON file containing the edited record
    #[arg(long, short)]
    pub file: PathBuf,

    /// Output the outcome as JSON
    #[arg(long)]
    pub json: bool
}

pub async fn run(global: &GlobalArgs, args: ApplyArgs) -> Result<()> {
    let edit = read_edit(&args.file)?;
    let config = global.load_config()?;
    let service = build_service(&config)?;

    let outcome = service.apply_edit(&config.owner, &edit).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match outcome {
        ReconcileOutcome::NoChange => {
            output::info(&format!("{} already matches the snapshot", edit.name));
        }
        ReconcileOutcome::Applied { mutations } => {
            for mutation in &mutations {
                println!("  {} {}", "✓".green(), mutation);
            }
            output::success(&format!("Updated {}", edit.name.cyan()));
            output::hint("Run `repo-manager refresh` to update the snapshot");
        }
    }

    Ok(())
}

fn read_edit(path: &Path) -> Result<EditRequest> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a valid edit", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use repo_sync::FilePresence;

    #[test]
    fn test_read_edit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edit.json");
        std::fs::write(
            &path,
            r#"{"name": "site", "file_presence": "mycrolinks", "tags": ["a"]}"#
        )
        .unwrap();

        let edit = read_edit(&path).unwrap();
        assert_eq!(edit.name, "site");
        assert_eq!(edit.file_presence, FilePresence::Mycrolinks);
        assert_eq!(edit.description, None);
        assert_eq!(edit.category, "");
    }

    #[test]
    fn test_read_edit_rejects_bad_presence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edit.json");
        std::fs::write(&path, r#"{"name": "site", "file_presence": "public"}"#).unwrap();

        let err = read_edit(&path).unwrap_err();
        assert!(err.to_string().contains("not a valid edit"));
    }
}
