use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::info;

/// Shutdown state machine
///
/// States:
/// 1. Running - normal operation
/// 2. Draining - no new dispatch work, in-flight sends allowed to complete
/// 3. Terminated - everything stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    Draining,
    Terminated,
}

/// Manages graceful shutdown with a drain period
pub struct Shutdown {
    state: watch::Sender<ShutdownState>,
    drain_timeout: Duration,
}

impl Shutdown {
    pub fn new(drain_timeout: Duration) -> Arc<Self> {
        let (state, _) = watch::channel(ShutdownState::Running);
        Arc::new(Self {
            state,
            drain_timeout,
        })
    }

    /// Get current state
    pub fn state(&self) -> ShutdownState {
        *self.state.borrow()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<ShutdownState> {
        self.state.subscribe()
    }

    /// Configured drain timeout
    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    /// Start draining (called on SIGTERM/SIGINT)
    pub fn start_drain(&self) {
        if self.state() != ShutdownState::Running {
            return;
        }

        info!(
            drain_timeout_secs = self.drain_timeout.as_secs(),
            "starting graceful shutdown drain"
        );
        let _ = self.state.send(ShutdownState::Draining);
    }

    /// Complete shutdown
    pub fn terminate(&self) {
        if self.state() == ShutdownState::Terminated {
            return;
        }

        info!("shutdown complete");
        let _ = self.state.send(ShutdownState::Terminated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_state_machine() {
        let shutdown = Shutdown::new(Duration::from_secs(30));
        assert_eq!(shutdown.state(), ShutdownState::Running);

        shutdown.start_drain();
        assert_eq!(shutdown.state(), ShutdownState::Draining);

        // Draining again is a no-op
        shutdown.start_drain();
        assert_eq!(shutdown.state(), ShutdownState::Draining);

        shutdown.terminate();
        assert_eq!(shutdown.state(), ShutdownState::Terminated);
    }

    #[tokio::test]
    async fn test_subscribers_observe_transitions() {
        let shutdown = Shutdown::new(Duration::from_secs(1));
        let mut rx = shutdown.subscribe();

        shutdown.start_drain();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), ShutdownState::Draining);
    }
}
