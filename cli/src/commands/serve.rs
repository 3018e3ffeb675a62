use anyhow::Result;
use clap::Args;
use repo_sync::MirrorServer;
use std::sync::Arc;

use super::{GlobalArgs, build_service};
use crate::output;

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides REPO_SYNC_PORT)
    #[arg(long, short)]
    pub port: Option<u16>
}

pub async fn run(global: &GlobalArgs, args: ServeArgs) -> Result<()> {
    let mut config = global.load_config()?;
    if let Some(port) = args.port {
        config.listen_port = port;
    }

    let service = Arc::new(build_service(&config)?);
    output::info(&format!(
        "Serving repositories of {} on port {}",
        config.owner, config.listen_port
    ));

    MirrorServer::new(config, service).run().await?;
    Ok(())
}
