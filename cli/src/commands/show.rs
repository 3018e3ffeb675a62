use anyhow::Result;
use clap::Args;
use repo_sync::{JsonFileStore, MirrorStore};

use super::GlobalArgs;
use crate::output;

#[derive(Args)]
pub struct ShowArgs {
    /// Output the snapshot as JSON
    #[arg(long)]
    pub json: bool,

    /// Only show the repository with this name
    #[arg(long)]
    pub name: Option<String>
}

pub async fn run(global: &GlobalArgs, args: ShowArgs) -> Result<()> {
    let config = global.load_config()?;
    let store = JsonFileStore::new(config.snapshot_path.clone());

    let Some(mut mirror) = store.load().await? else {
        output::warn(&format!(
            "No snapshot at {}",
            config.snapshot_path.display()
        ));
        output::hint("Run `repo-manager refresh` first");
        return Ok(());
    };

    if let Some(name) = &args.name {
        mirror.retain(|r| &r.name == name);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&mirror)?);
        return Ok(());
    }

    output::repo_table(&mirror);
    Ok(())
}
