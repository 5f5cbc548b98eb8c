//! Retry handling for failed sends.
//!
//! Classifies provider failures as transient or permanent. Transient
//! failures are re-enqueued with exponential backoff up to the retry bound;
//! everything else terminates the contact and emits a terminal-failure
//! record for operator visibility. Backoff is a pure function of the
//! attempt count, so retry scheduling needs no timers of its own.

use std::time::Duration;

use tracing::{debug, warn};

use crate::bootstrap::{Event, SharedEngineState};
use crate::campaign::ContactRepository;
use crate::clock::Clock;
use crate::lifecycle::maybe_complete_campaign;
use crate::planner::advance_into_window;
use crate::provider::SendError;
use crate::queue::{QueueEntry, QueueStore};

/// Backoff before attempt `attempts + 1`: `base * 2^(attempts - 1)`.
pub fn backoff_delay(base: Duration, attempts: u32) -> Duration {
    let exp = attempts.saturating_sub(1).min(20);
    Duration::from_millis(base.as_millis() as u64 * 2u64.pow(exp))
}

/// Decides what happens to a contact after a failed send.
pub struct RetryCoordinator {
    state: SharedEngineState,
}

impl RetryCoordinator {
    pub fn new(state: SharedEngineState) -> Self {
        Self { state }
    }

    /// Handle a dispatch failure for `entry` whose send was attempt number
    /// `attempts`. The attempt count has already been recorded on the
    /// contact; queue-entry uniqueness guarantees no concurrent attempt for
    /// the same contact is in flight.
    pub fn handle_failure(&self, entry: &QueueEntry, attempts: u32, err: &SendError) {
        let dispatch = &self.state.config.dispatch;

        if err.is_transient() && attempts <= dispatch.max_retries {
            let delay = backoff_delay(dispatch.retry_delay, attempts);
            let mut due = self.state.clock.now()
                + chrono::Duration::milliseconds(delay.as_millis() as i64);
            if dispatch.business_hours_only {
                due = advance_into_window(
                    due,
                    dispatch.business_start_hour,
                    dispatch.business_end_hour,
                );
            }

            let mut retry = entry.clone();
            retry.due_at = due;
            retry.retry_count = attempts;

            match self.state.queue.enqueue(retry) {
                Ok(()) => {
                    self.state.counters.inc_retries_scheduled();
                    debug!(
                        campaign_id = %entry.campaign_id,
                        contact_id = %entry.contact_id,
                        attempt = attempts,
                        next_retry_ms = delay.as_millis() as u64,
                        error = %err,
                        "send failed, retry scheduled"
                    );
                }
                Err(e) => {
                    warn!(
                        campaign_id = %entry.campaign_id,
                        contact_id = %entry.contact_id,
                        error = %e,
                        "failed to re-enqueue retry; contact needs re-planning"
                    );
                    self.state.counters.inc_queue_errors();
                }
            }
            return;
        }

        // Permanent failure, or the retry bound is spent.
        let reason = if err.is_transient() {
            format!("max retries exhausted: {}", err)
        } else {
            err.to_string()
        };

        let failure_reason = reason.clone();
        self.state.contacts.update(
            entry.contact_id,
            Box::new(move |c| c.mark_failed(failure_reason)),
        );
        self.state.counters.inc_messages_failed();

        warn!(
            campaign_id = %entry.campaign_id,
            contact_id = %entry.contact_id,
            attempts,
            reason = %reason,
            "contact failed terminally"
        );
        self.state.events.publish(Event::ContactFailed {
            campaign_id: entry.campaign_id,
            contact_id: entry.contact_id,
            attempts,
            reason,
        });

        maybe_complete_campaign(&self.state, entry.campaign_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_ladder_matches_defaults() {
        let base = Duration::from_millis(5_000);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(5_000));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(10_000));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(20_000));
    }

    #[test]
    fn test_backoff_zero_attempts_uses_base() {
        let base = Duration::from_millis(5_000);
        assert_eq!(backoff_delay(base, 0), base);
    }

    #[test]
    fn test_backoff_exponent_is_capped() {
        let base = Duration::from_millis(1);
        // Far past any sane retry bound; must not overflow.
        let delay = backoff_delay(base, 64);
        assert_eq!(delay, Duration::from_millis(1 << 20));
    }
}
