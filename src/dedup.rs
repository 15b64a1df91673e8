// src/dedup.rs

use dashmap::DashSet;


/// Result of offering a message id to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// First delivery of this id across all connections.
    New,
    /// Some connection already delivered this id.
    Seen,
}

/// Process-wide set of every message id accepted so far.
///
/// The lookup and the insertion happen under the same shard lock, so when
/// several readers race on one id exactly one of them observes `New`.
/// Entries are never evicted.
#[derive(Debug, Default)]
pub struct DedupRegistry {
    seen: DashSet<u64>,
}

impl DedupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, msg_id: u64) -> Observation {
        if self.seen.insert(msg_id) {
            Observation::New
        } else {
            Observation::Seen
        }
    }

    pub fn contains(&self, msg_id: u64) -> bool {
        self.seen.contains(&msg_id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
