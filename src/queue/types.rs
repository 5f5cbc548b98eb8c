//! Types for the dispatch queue.

use chrono::{DateTime, Utc};

use crate::campaign::{CampaignId, ContactId, TenantId};

/// Due-time entries of paused campaigns are parked here (9999-12-31T23:59:59Z).
pub const PAUSED_DUE_MS: i64 = 253_402_300_799_000;

/// The sentinel instant paused entries are parked at.
pub fn paused_due() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(PAUSED_DUE_MS).unwrap()
}

/// Identity of a queue entry: at most one live entry per (campaign, contact).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey {
    /// Owning campaign
    pub campaign_id: CampaignId,
    /// Target contact
    pub contact_id: ContactId,
}

impl EntryKey {
    /// Create an entry key.
    pub fn new(campaign_id: CampaignId, contact_id: ContactId) -> Self {
        Self {
            campaign_id,
            contact_id,
        }
    }
}

/// One unit of pending dispatch work.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    /// Owning campaign
    pub campaign_id: CampaignId,
    /// Target contact
    pub contact_id: ContactId,
    /// Tenant the work belongs to
    pub tenant_id: TenantId,
    /// Instant before which the entry must not be dispatched
    pub due_at: DateTime<Utc>,
    /// Retry attempts already consumed
    pub retry_count: u32,
}

impl QueueEntry {
    /// Create a first-attempt entry.
    pub fn new(
        campaign_id: CampaignId,
        contact_id: ContactId,
        tenant_id: TenantId,
        due_at: DateTime<Utc>,
    ) -> Self {
        Self {
            campaign_id,
            contact_id,
            tenant_id,
            due_at,
            retry_count: 0,
        }
    }

    /// Set the retry count.
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Identity of this entry.
    pub fn key(&self) -> EntryKey {
        EntryKey::new(self.campaign_id, self.contact_id)
    }
}

/// Queue store error. Callers treat these as transient: the current tick is
/// abandoned cleanly and the work is retried on the next interval.
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueueError {
    #[error("queue store unavailable: {0}")]
    Unavailable(String),

    #[error("queue entry serialization failed: {0}")]
    Codec(String),
}
