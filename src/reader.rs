// src/reader.rs

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::error;

use crate::config::{Annotation, FeedConfig};
use crate::dedup::{DedupRegistry, Observation};
use crate::latency::LatencyTracker;
use crate::parse::{create_parser, ParseError, UpdateParser};
use crate::sink::SinkQueue;


/// Wall-clock milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_millis() as i64,
        Err(before) => -(before.duration().as_millis() as i64),
    }
}


/// State shared by every reader: the parser, the dedup registry, the latency
/// tracker and the sink.
///
/// Each component is behind its own guard and the handler touches them one at
/// a time in the order registry, tracker, sink. No guard is held while another
/// is taken.
#[derive(Clone)]
pub struct Pipeline {
    parser: Arc<dyn UpdateParser + Send + Sync>,
    registry: Arc<DedupRegistry>,
    tracker: Arc<LatencyTracker>,
    sink: Arc<SinkQueue>,
    annotation: Annotation,
}

impl Pipeline {
    pub fn new(config: &FeedConfig, sink: Arc<SinkQueue>) -> Self {
        Self {
            parser: create_parser(),
            registry: Arc::new(DedupRegistry::new()),
            tracker: Arc::new(LatencyTracker::new(config.latency_window)),
            sink,
            annotation: config.annotation,
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn UpdateParser + Send + Sync>) -> Self {
        self.parser = parser;
        self
    }

    pub fn registry(&self) -> &DedupRegistry {
        &self.registry
    }

    pub fn tracker(&self) -> &LatencyTracker {
        &self.tracker
    }

    pub fn sink(&self) -> &Arc<SinkQueue> {
        &self.sink
    }
}


/// What happened to one inbound payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accepted { latency_ms: i64 },
    Duplicate,
    Rejected,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReaderStats {
    pub accepted: u64,
    pub duplicates: u64,
    pub rejected: u64,
}


/// Message handling for a single connection.
pub struct FeedHandler {
    id: usize,
    pipeline: Pipeline,
    stats: ReaderStats,
}

impl FeedHandler {
    pub fn new(id: usize, pipeline: Pipeline) -> Self {
        Self {
            id,
            pipeline,
            stats: ReaderStats::default(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    /// Handles one text frame received at `receive_ts_ms`.
    ///
    /// Malformed payloads are logged and dropped without touching the
    /// registry. A payload whose id was already accepted by any connection is
    /// dropped silently. Otherwise the latency is recorded and the annotated
    /// payload is queued for the writer.
    pub fn on_message(&mut self, raw: &[u8], receive_ts_ms: i64) -> Outcome {
        let text = match std::str::from_utf8(raw) {
            Ok(text) => text,
            Err(e) => return self.reject(e.into()),
        };
        let update = match self.pipeline.parser.parse(text) {
            Ok(update) => update,
            Err(e) => return self.reject(e),
        };

        #[cfg(feature = "print_parsed")]
        {
            println!("[Client {}] {:?}", self.id, update);
        }

        if self.pipeline.registry.observe(update.msg_id) == Observation::Seen {
            self.stats.duplicates += 1;
            return Outcome::Duplicate;
        }

        let latency_ms = receive_ts_ms.saturating_sub(update.server_ts_ms);
        self.pipeline.tracker.record(self.id, latency_ms);
        self.pipeline
            .sink
            .push(self.pipeline.annotation.apply(text, latency_ms));

        self.stats.accepted += 1;
        Outcome::Accepted { latency_ms }
    }

    fn reject(&mut self, e: ParseError) -> Outcome {
        error!("[Client {}] Error parsing message: {}", self.id, e);
        self.stats.rejected += 1;
        Outcome::Rejected
    }
}
