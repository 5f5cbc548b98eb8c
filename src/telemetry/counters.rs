//! Engine counters.
//!
//! One injectable set of atomic counters owned by the engine state and
//! surfaced on the admin stats endpoint. Capacity deferrals and
//! state-conflict skips are counted here precisely because they are not
//! errors.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic counter set for the dispatch engine.
#[derive(Debug, Default)]
pub struct EngineCounters {
    ticks: AtomicU64,
    messages_sent: AtomicU64,
    messages_failed: AtomicU64,
    retries_scheduled: AtomicU64,
    duplicates_suppressed: AtomicU64,
    capacity_deferred: AtomicU64,
    state_conflicts: AtomicU64,
    queue_errors: AtomicU64,
    stuck_flagged: AtomicU64,
    campaigns_completed: AtomicU64,
}

impl EngineCounters {
    /// Create a zeroed counter set.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_ticks(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_messages_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_messages_failed(&self) {
        self.messages_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_retries_scheduled(&self) {
        self.retries_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_duplicates_suppressed(&self) {
        self.duplicates_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_capacity_deferred(&self) {
        self.capacity_deferred.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_state_conflicts(&self) {
        self.state_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_queue_errors(&self) {
        self.queue_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_stuck_flagged(&self) {
        self.stuck_flagged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_campaigns_completed(&self) {
        self.campaigns_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time snapshot for the stats endpoint.
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_failed: self.messages_failed.load(Ordering::Relaxed),
            retries_scheduled: self.retries_scheduled.load(Ordering::Relaxed),
            duplicates_suppressed: self.duplicates_suppressed.load(Ordering::Relaxed),
            capacity_deferred: self.capacity_deferred.load(Ordering::Relaxed),
            state_conflicts: self.state_conflicts.load(Ordering::Relaxed),
            queue_errors: self.queue_errors.load(Ordering::Relaxed),
            stuck_flagged: self.stuck_flagged.load(Ordering::Relaxed),
            campaigns_completed: self.campaigns_completed.load(Ordering::Relaxed),
        }
    }
}

/// Serializable counter snapshot.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CountersSnapshot {
    pub ticks: u64,
    pub messages_sent: u64,
    pub messages_failed: u64,
    pub retries_scheduled: u64,
    pub duplicates_suppressed: u64,
    pub capacity_deferred: u64,
    pub state_conflicts: u64,
    pub queue_errors: u64,
    pub stuck_flagged: u64,
    pub campaigns_completed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let counters = EngineCounters::new();
        counters.inc_messages_sent();
        counters.inc_messages_sent();
        counters.inc_messages_failed();
        counters.inc_retries_scheduled();

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.messages_sent, 2);
        assert_eq!(snapshot.messages_failed, 1);
        assert_eq!(snapshot.retries_scheduled, 1);
        assert_eq!(snapshot.ticks, 0);
    }
}
