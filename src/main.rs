// src/main.rs

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use feed_fanin::config::FeedConfig;
use feed_fanin::supervisor;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Opens redundant WebSocket subscriptions to one feed and writes each
/// unique update once, annotated with its measured latency.
#[derive(Debug, Parser)]
#[command(name = "feed_fanin", version)]
struct Args {
    /// How many concurrent connections to open (at least 1)
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    number_of_connections: u32,

    /// TOML file overriding the upstream uri, output path and latency window
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match &args.config {
        Some(path) => FeedConfig::load(path)?,
        None => FeedConfig::default(),
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    supervisor::run(config, args.number_of_connections as usize, shutdown).await?;
    Ok(())
}
