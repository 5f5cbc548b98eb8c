//! Concurrency admission control.
//!
//! Two counting permit pools: a global in-flight send limiter and a queue
//! drain limiter. Both reject (non-blocking try-acquire) rather than queue,
//! so tick latency stays bounded; unacquired work remains in the queue store
//! and is retried next tick without consuming a retry.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Dispatch permit pools. Constructed once and dependency-injected; owned by
/// the engine state, lifecycle tied to process start/stop.
pub struct ConcurrencyGate {
    send: Arc<Semaphore>,
    drain: Arc<Semaphore>,
    send_capacity: usize,
    drain_capacity: usize,
}

impl ConcurrencyGate {
    /// Create a gate with the given pool capacities.
    pub fn new(send_permits: usize, drain_permits: usize) -> Self {
        Self {
            send: Arc::new(Semaphore::new(send_permits)),
            drain: Arc::new(Semaphore::new(drain_permits)),
            send_capacity: send_permits,
            drain_capacity: drain_permits,
        }
    }

    /// Try to acquire a send permit. Never blocks.
    pub fn try_send_permit(&self) -> Option<OwnedSemaphorePermit> {
        self.send.clone().try_acquire_owned().ok()
    }

    /// Try to acquire a drain permit. Never blocks.
    pub fn try_drain_permit(&self) -> Option<OwnedSemaphorePermit> {
        self.drain.clone().try_acquire_owned().ok()
    }

    /// Send pool capacity.
    pub fn send_capacity(&self) -> usize {
        self.send_capacity
    }

    /// Drain pool capacity.
    pub fn drain_capacity(&self) -> usize {
        self.drain_capacity
    }

    /// Sends currently in flight.
    pub fn in_flight(&self) -> usize {
        self.send_capacity - self.send.available_permits()
    }

    /// Fraction of the send pool in use, 0.0 - 1.0.
    pub fn send_utilization(&self) -> f64 {
        if self.send_capacity == 0 {
            return 0.0;
        }
        self.in_flight() as f64 / self.send_capacity as f64
    }
}
