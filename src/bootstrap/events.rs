use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use crate::campaign::{CampaignId, ContactId};

/// Internal event types for component communication and operator visibility
#[derive(Debug, Clone)]
pub enum Event {
    /// Server is starting
    Starting,

    /// Server is ready to dispatch
    Ready,

    /// Shutdown initiated
    ShutdownStarted,

    /// Campaign began dispatching
    CampaignStarted {
        campaign_id: CampaignId,
        contacts: usize,
    },

    /// Campaign paused; entries parked
    CampaignPaused {
        campaign_id: CampaignId,
        parked: u64,
    },

    /// Campaign resumed; entries released
    CampaignResumed {
        campaign_id: CampaignId,
        released: u64,
    },

    /// Campaign canceled; entries purged
    CampaignCanceled {
        campaign_id: CampaignId,
        purged: u64,
    },

    /// All contacts reached a terminal state
    CampaignCompleted { campaign_id: CampaignId },

    /// Contact messaged successfully
    ContactSent {
        campaign_id: CampaignId,
        contact_id: ContactId,
        message_id: String,
    },

    /// Terminal failure record for operator visibility
    ContactFailed {
        campaign_id: CampaignId,
        contact_id: ContactId,
        attempts: u32,
        reason: String,
    },

    /// Contact skipped because a fresher engagement owns the phone
    DuplicateSuppressed {
        campaign_id: CampaignId,
        contact_id: ContactId,
        winner: CampaignId,
    },
}

/// Internal event bus for component communication
///
/// Uses broadcast channels to allow multiple subscribers.
/// Components can publish events and subscribe to events they care about.
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new(capacity: usize) -> Arc<Self> {
        let (tx, _) = broadcast::channel(capacity);
        Arc::new(Self { tx })
    }

    /// Publish an event
    pub fn publish(&self, event: Event) {
        debug!(event = ?event, "publishing event");
        // Ignore send errors (no subscribers)
        let _ = self.tx.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }
}
