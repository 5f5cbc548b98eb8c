//! Mock provider for development and testing without upstream connections.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, trace};

use crate::config::{MockResponse, ProviderConfig};

use super::{MessagePayload, ProviderAck, ProviderClient, SendError};

/// Mock provider that generates responses locally.
///
/// Responses come from a scripted sequence when one is loaded, otherwise
/// from the configured default behavior.
pub struct MockProvider {
    /// Default response behavior
    response: MockResponse,
    /// Simulated latency per send
    latency: Duration,
    /// Scripted outcomes, consumed front to back
    script: Mutex<VecDeque<Result<(), SendError>>>,
    /// Message ID counter
    message_counter: AtomicU64,
    /// Total requests processed
    request_count: AtomicU64,
    /// Successful responses
    success_count: AtomicU64,
    /// Error responses
    error_count: AtomicU64,
}

impl MockProvider {
    /// Create a mock provider from configuration.
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            response: config.response.clone(),
            latency: config.latency,
            script: Mutex::new(VecDeque::new()),
            message_counter: AtomicU64::new(1),
            request_count: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
        }
    }

    /// Create a mock with default success responses.
    pub fn success() -> Self {
        Self::new(&ProviderConfig::default())
    }

    /// Set simulated latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Load a scripted outcome sequence. `Ok(())` sends succeed with a
    /// generated message ID; errors are returned as-is.
    pub fn with_script(self, outcomes: Vec<Result<(), SendError>>) -> Self {
        *self.script.lock().unwrap() = outcomes.into();
        self
    }

    /// Append one scripted outcome.
    pub fn push_outcome(&self, outcome: Result<(), SendError>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    fn next_message_id(&self) -> String {
        let id = self.message_counter.fetch_add(1, Ordering::Relaxed);
        format!("MOCK{:016X}", id)
    }

    fn next_outcome(&self) -> Result<(), SendError> {
        if let Some(outcome) = self.script.lock().unwrap().pop_front() {
            return outcome;
        }

        match &self.response {
            MockResponse::Success => Ok(()),
            MockResponse::Transient => Err(SendError::Unavailable("mock outage".into())),
            MockResponse::Permanent => Err(SendError::Rejected("mock rejection".into())),
        }
    }

    /// Get total request count.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Get success count.
    pub fn success_count(&self) -> u64 {
        self.success_count.load(Ordering::Relaxed)
    }

    /// Get error count.
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    async fn send(
        &self,
        destination: &str,
        _payload: &MessagePayload,
    ) -> Result<ProviderAck, SendError> {
        self.request_count.fetch_add(1, Ordering::Relaxed);

        if !self.latency.is_zero() {
            trace!(latency_ms = self.latency.as_millis(), "simulating latency");
            sleep(self.latency).await;
        }

        match self.next_outcome() {
            Ok(()) => {
                let message_id = self.next_message_id();
                self.success_count.fetch_add(1, Ordering::Relaxed);
                debug!(dest = %destination, message_id = %message_id, "mock send ok");
                Ok(ProviderAck { message_id })
            }
            Err(e) => {
                self.error_count.fetch_add(1, Ordering::Relaxed);
                debug!(dest = %destination, error = %e, "mock send failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::CampaignId;

    fn payload() -> MessagePayload {
        MessagePayload {
            campaign_id: CampaignId::from_u64(1),
            body: "hello".into(),
        }
    }

    #[tokio::test]
    async fn test_mock_success() {
        let mock = MockProvider::success();

        let ack = mock.send("+258841234567", &payload()).await.unwrap();
        assert!(ack.message_id.starts_with("MOCK"));
        assert_eq!(mock.request_count(), 1);
        assert_eq!(mock.success_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_configured_failure() {
        let config = ProviderConfig {
            response: MockResponse::Permanent,
            latency: Duration::ZERO,
        };
        let mock = MockProvider::new(&config);

        let err = mock.send("+258841234567", &payload()).await.unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(mock.error_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_script_consumed_in_order() {
        let mock = MockProvider::success().with_script(vec![
            Err(SendError::Throttled),
            Err(SendError::Timeout),
            Ok(()),
        ]);

        assert!(mock.send("+1", &payload()).await.is_err());
        assert!(mock.send("+1", &payload()).await.is_err());
        assert!(mock.send("+1", &payload()).await.is_ok());
        // Script drained; falls back to configured default.
        assert!(mock.send("+1", &payload()).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_latency() {
        let mock = MockProvider::success().with_latency(Duration::from_millis(10));

        let start = std::time::Instant::now();
        let _ = mock.send("+1", &payload()).await;
        assert!(start.elapsed() >= Duration::from_millis(10));
    }
}
