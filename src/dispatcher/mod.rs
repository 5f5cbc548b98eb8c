//! Dispatch coordination.
//!
//! One coordinator loop runs on a fixed tick interval and is the sole
//! driver of dequeue cycles. Each tick pulls due work under the drain
//! permit pool and spawns one bounded task per entry; the only blocking
//! operation is the provider call, and it never runs inside the loop
//! itself. Idle campaigns hold no worker resources - their delays exist
//! purely as due-times in the queue store.

mod gate;
mod processor;
mod retry;

pub use gate::ConcurrencyGate;
pub use processor::dispatch_entry;
pub use retry::{backoff_delay, RetryCoordinator};

use tracing::{debug, info, warn};

use crate::bootstrap::{SharedEngineState, Shutdown, ShutdownState};
use crate::clock::Clock;
use crate::queue::QueueStore;

use std::sync::Arc;

/// Coordinator loop driving the dispatch engine.
pub struct DispatchCoordinator {
    state: SharedEngineState,
    shutdown: Arc<Shutdown>,
}

impl DispatchCoordinator {
    pub fn new(state: SharedEngineState, shutdown: Arc<Shutdown>) -> Self {
        Self { state, shutdown }
    }

    /// Run the coordinator until shutdown.
    pub async fn run(self) {
        let tick = self.state.config.dispatch.tick_interval;
        info!(tick_ms = tick.as_millis() as u64, "dispatch coordinator started");

        let mut interval = tokio::time::interval(tick);
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow_and_update() != ShutdownState::Running {
                        info!("dispatch coordinator shutting down");
                        break;
                    }
                }

                _ = interval.tick() => {
                    self.drive_tick().await;
                }
            }
        }
    }

    /// Run one dequeue cycle.
    async fn drive_tick(&self) {
        self.state.counters.inc_ticks();

        // Drain permits bound how many entries one tick may pull from the
        // store, independent of send concurrency.
        let mut drain_permits = Vec::new();
        for _ in 0..self.state.gate.drain_capacity() {
            match self.state.gate.try_drain_permit() {
                Some(permit) => drain_permits.push(permit),
                None => break,
            }
        }
        if drain_permits.is_empty() {
            self.state.counters.inc_capacity_deferred();
            return;
        }

        let now = self.state.clock.now();
        let batch = match self.state.queue.dequeue_due(now, drain_permits.len()) {
            Ok(batch) => batch,
            Err(e) => {
                // Infrastructure failure: abort this tick cleanly, nothing
                // was claimed, next interval retries.
                warn!(error = %e, "queue store unavailable, skipping tick");
                self.state.counters.inc_queue_errors();
                return;
            }
        };
        drop(drain_permits);

        if batch.is_empty() {
            return;
        }

        let stuck_after =
            chrono::Duration::milliseconds(self.state.config.dispatch.batch_timeout.as_millis() as i64);
        for entry in &batch {
            // Advisory only: flag work running far behind its schedule.
            if now - entry.due_at > stuck_after {
                warn!(
                    campaign_id = %entry.campaign_id,
                    contact_id = %entry.contact_id,
                    behind_secs = (now - entry.due_at).num_seconds(),
                    "batch running behind schedule"
                );
                self.state.counters.inc_stuck_flagged();
            }
        }

        debug!(count = batch.len(), "dispatching due entries");
        for entry in batch {
            let state = self.state.clone();
            tokio::spawn(async move {
                dispatch_entry(state, entry).await;
            });
        }
    }
}
