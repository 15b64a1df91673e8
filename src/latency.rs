// src/latency.rs

use std::collections::VecDeque;

use dashmap::DashMap;
use tracing::info;


/// Default size of the rolling latency window per connection.
pub const LATENCY_WINDOW: usize = 100;


/// Percentiles over one full window of samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencySummary {
    pub p50: i64,
    pub p90: i64,
}

/// Rolling latency windows keyed by connection id.
///
/// A window holds the most recent `window` samples for its connection. Once
/// it is full, every new sample produces a summary and a log line.
#[derive(Debug)]
pub struct LatencyTracker {
    window: usize,
    windows: DashMap<usize, VecDeque<i64>>,
}

impl LatencyTracker {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            windows: DashMap::new(),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Appends `latency_ms` to the window for `id`, evicting the oldest sample
    /// when the window overflows.
    pub fn record(&self, id: usize, latency_ms: i64) -> Option<LatencySummary> {
        let mut samples = self
            .windows
            .entry(id)
            .or_insert_with(|| VecDeque::with_capacity(self.window + 1));

        samples.push_back(latency_ms);
        if samples.len() > self.window {
            samples.pop_front();
        }
        if samples.len() < self.window {
            return None;
        }

        let mut sorted: Vec<i64> = samples.iter().copied().collect();
        sorted.sort_unstable();

        let summary = LatencySummary {
            p50: sorted[self.window / 2],
            p90: sorted[(self.window * 90) / 100],
        };
        info!("[Client {}] p50: {} ms, p90: {} ms", id, summary.p50, summary.p90);
        Some(summary)
    }

    /// Current window contents for `id`, oldest first.
    pub fn samples(&self, id: usize) -> Vec<i64> {
        self.windows
            .get(&id)
            .map(|samples| samples.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new(LATENCY_WINDOW)
    }
}
