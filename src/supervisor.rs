// src/supervisor.rs

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::FeedConfig;
use crate::reader::{FeedHandler, Pipeline};
use crate::sink::{run_writer, SinkQueue};
use crate::ws::start_ws_reader;


/// Totals reported once every reader and the writer have finished.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Distinct message ids accepted across all connections.
    pub unique_messages: usize,
    /// Lines the writer put in the output file.
    pub lines_written: u64,
}

/// Runs `connections` redundant readers against `config.uri` until all of them
/// end or `shutdown` resolves, then stops and joins the writer.
///
/// - Starts the writer before any reader
/// - Reader ids run from 1 to `connections`
/// - On shutdown the remaining readers are aborted; everything they already
///   queued is still written
pub async fn run<F>(config: FeedConfig, connections: usize, shutdown: F) -> Result<RunReport>
where
    F: Future<Output = ()>,
{
    let sink = Arc::new(SinkQueue::new());

    let writer = tokio::spawn({
        let sink = Arc::clone(&sink);
        let path = config.output_path.clone();
        async move { run_writer(&path, &sink).await }
    });

    let pipeline = Pipeline::new(&config, Arc::clone(&sink));
    let mut readers = JoinSet::new();
    for id in 1..=connections {
        let handler = FeedHandler::new(id, pipeline.clone());
        readers.spawn(start_ws_reader(config.uri.clone(), handler));
    }
    info!("Started {} connections to {}", connections, config.uri);

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            joined = readers.join_next() => match joined {
                Some(Ok(stats)) => info!(
                    "Reader finished: accepted={} duplicates={} rejected={}",
                    stats.accepted, stats.duplicates, stats.rejected
                ),
                Some(Err(e)) => warn!("Reader task failed: {e}"),
                None => break,
            },
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                readers.shutdown().await;
                break;
            }
        }
    }

    sink.stop();
    let lines_written = writer.await?;

    let report = RunReport {
        unique_messages: pipeline.registry().len(),
        lines_written,
    };
    info!(
        "Aggregator stopped: {} unique messages, {} lines written",
        report.unique_messages, report.lines_written
    );
    Ok(report)
}
