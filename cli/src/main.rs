use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod output;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => commands::serve::run(&cli.global, args).await,
        Commands::Refresh(args) => commands::refresh::run(&cli.global, args).await,
        Commands::Show(args) => commands::show::run(&cli.global, args).await,
        Commands::Apply(args) => commands::apply::run(&cli.global, args).await
    }
}
