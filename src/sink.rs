// src/sink.rs

use std::collections::VecDeque;
use std::path::Path;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::Notify;
use tracing::{error, info};


#[derive(Debug, Default)]
struct SinkState {
    items: VecDeque<String>,
    stopped: bool,
}

/// Items handed to the writer by one `drain_or_wait` call.
#[derive(Debug, Default)]
pub struct Drained {
    pub items: Vec<String>,
    /// Set when `stop()` had been called at drain time. Every item pushed
    /// before `stop()` is contained in this drain or an earlier one.
    pub stopped: bool,
}

/// Unbounded FIFO between the readers and the single writer.
#[derive(Debug, Default)]
pub struct SinkQueue {
    state: Mutex<SinkState>,
    notify: Notify,
}

impl SinkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, item: String) {
        self.state.lock().items.push_back(item);
        self.notify.notify_one();
    }

    pub fn stop(&self) {
        self.state.lock().stopped = true;
        self.notify.notify_one();
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits until the queue is non-empty or stopped, then takes everything queued.
    pub async fn drain_or_wait(&self) -> Drained {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock();
                if !state.items.is_empty() || state.stopped {
                    return Drained {
                        items: state.items.drain(..).collect(),
                        stopped: state.stopped,
                    };
                }
            }
            notified.await;
        }
    }
}


/// Drains `sink` into `path` (truncated on open), one item per line, until the
/// sink is stopped and empty.
///
/// `written` counts the lines flushed so far and stays accurate when a write
/// fails part way. A write failure ends the writer; items queued afterwards
/// stay in the sink.
pub async fn writer_loop(path: &Path, sink: &SinkQueue, written: &mut u64) -> Result<()> {
    let file = File::create(path)
        .await
        .with_context(|| format!("Failed to open output file: {}", path.display()))?;
    let mut out = BufWriter::new(file);
    info!("Writing aggregated data to {}", path.display());

    write_lines(&mut out, sink, written)
        .await
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    out.shutdown().await?;
    info!("Writer finished, {} lines written to {}", written, path.display());
    Ok(())
}

/// The drain/write loop behind [`writer_loop`], over any async writer.
pub async fn write_lines<W>(out: &mut W, sink: &SinkQueue, written: &mut u64) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let drained = sink.drain_or_wait().await;

        for item in &drained.items {
            out.write_all(item.as_bytes()).await?;
            out.write_all(b"\n").await?;
        }
        out.flush().await?;
        *written += drained.items.len() as u64;

        if drained.stopped {
            return Ok(());
        }
    }
}

/// Runs [`writer_loop`] and logs its failure instead of returning it.
/// Returns the number of lines flushed before the writer ended.
pub async fn run_writer(path: &Path, sink: &SinkQueue) -> u64 {
    let mut written = 0;
    if let Err(e) = writer_loop(path, sink, &mut written).await {
        error!("Writer stopped after {} lines: {:#}", written, e);
    }
    written
}
