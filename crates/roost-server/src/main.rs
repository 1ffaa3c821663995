//! roost: a streaming relay and conversation server for a local
//! inference backend

mod config;
mod error;
mod history;
mod models;
mod relay;
mod server;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::{config::Config, server::AppState};

#[derive(Parser, Debug)]
#[command(name = "roost", version, about = "Streaming chat relay for a local inference backend")]
struct Args {
    /// Path to the config file (default: platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Backend base URL (overrides the config file)
    #[arg(long)]
    backend_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let mut config = Config::load(args.config.as_deref());
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(backend_url) = args.backend_url {
        config.backend_url = backend_url;
    }

    let state = AppState::new(config)?;
    server::serve(state).await
}
