pub mod apply;
pub mod refresh;
pub mod serve;
pub mod show;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use repo_sync::config::{load_from_env, load_from_toml};
use repo_sync::github::create_github_client;
use repo_sync::{JsonFileStore, RepoSyncConfig, RepoSyncService};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "repo-manager",
    author,
    version,
    about = "GitHub Repo Manager - mirror and edit repository metadata",
    long_about = "Mirrors the name, description, visibility and marker files (.personal, \
                  .mycrolinks, .tags) of every repository you own into a local snapshot, and \
                  writes edits back as the minimal set of marker file changes.\n\nConfigured \
                  through GH_USERNAME, GH_PAT and REPO_SYNC_* environment variables or a TOML \
                  file."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// TOML configuration file; environment variables are used when omitted
    #[arg(long, short, global = true, env = "REPO_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the snapshot file location
    #[arg(long, global = true)]
    pub snapshot: Option<PathBuf>
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP front end")]
    Serve(serve::ServeArgs),

    #[command(about = "Rebuild the mirror from GitHub and save the snapshot")]
    Refresh(refresh::RefreshArgs),

    #[command(about = "Print the last saved snapshot")]
    Show(show::ShowArgs),

    #[command(about = "Apply an edit read from a JSON file")]
    Apply(apply::ApplyArgs)
}

impl GlobalArgs {
    /// Configuration from the TOML file or the environment, with CLI overrides.
    pub fn load_config(&self) -> Result<RepoSyncConfig> {
        let mut config = match &self.config {
            Some(path) => load_from_toml(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => load_from_env()?
        };

        if let Some(snapshot) = &self.snapshot {
            config.snapshot_path = snapshot.clone();
        }
        Ok(config)
    }
}

/// Wires the GitHub client and snapshot file into a service.
pub fn build_service(config: &RepoSyncConfig) -> Result<RepoSyncService> {
    config.check()?;
    let client = create_github_client(config)?;
    let store = Arc::new(JsonFileStore::new(config.snapshot_path.clone()));
    Ok(RepoSyncService::new(config, client, store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "repo-manager",
            "show",
            "--snapshot",
            "/tmp/mirror.json",
            "--json"
        ])
        .unwrap();

        assert_eq!(cli.global.snapshot, Some(PathBuf::from("/tmp/mirror.json")));
        assert!(matches!(cli.command, Commands::Show(ref args) if args.json));
    }

    #[test]
    fn test_apply_requires_file() {
        assert!(Cli::try_parse_from(["repo-manager", "apply"]).is_err());
    }

    #[test]
    fn test_snapshot_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repo-sync.toml");
        std::fs::write(&path, "owner = \"octocat\"\napi_token = \"ghp_x\"\n").unwrap();

        let global = GlobalArgs {
            config: Some(path),
            snapshot: Some(PathBuf::from("elsewhere.json"))
        };
        let config = global.load_config().unwrap();

        assert_eq!(config.owner, "octocat");
        assert_eq!(config.snapshot_path, PathBuf::from("elsewhere.json"));
    }

    #[test]
    fn test_build_service_rejects_missing_credentials() {
        let config = RepoSyncConfig::default();
        assert!(build_service(&config).is_err());
    }
}
