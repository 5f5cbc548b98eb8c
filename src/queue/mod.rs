//! Durable, ordered store of pending dispatch work.
//!
//! The queue is the single source of truth for "what to send next". Entries
//! are keyed by (campaign, contact) so enqueue is an idempotent upsert, and
//! ordered by due-time so delays live in the store instead of in sleeping
//! workers. Dequeue atomically claims entries; no entry is ever handed to
//! two callers.
//!
//! # Implementations
//!
//! - [`MemoryQueueStore`]: in-memory, volatile - for development/testing
//! - [`PersistentQueueStore`]: fjall-backed, durable - survives restarts

mod factory;
mod memory;
mod persistent;
pub mod types;

pub use factory::create_queue_store;
pub use memory::MemoryQueueStore;
pub use persistent::PersistentQueueStore;
pub use types::{paused_due, EntryKey, QueueEntry, QueueError, PAUSED_DUE_MS};

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::campaign::CampaignId;

/// Ordered, shared store of pending dispatch work.
///
/// All implementations must be thread-safe (Send + Sync) and atomic per
/// operation: `dequeue_due` removes what it returns, bulk operations either
/// apply to every entry of the campaign or fail without partial claims.
pub trait QueueStore: Send + Sync {
    /// Insert or overwrite the entry for (campaign, contact).
    fn enqueue(&self, entry: QueueEntry) -> Result<(), QueueError>;

    /// Atomically remove and return up to `limit` entries with
    /// `due_at <= now`, earliest first, ties broken by insertion order.
    fn dequeue_due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<QueueEntry>, QueueError>;

    /// Move a live entry to a new due-time. Returns false if absent.
    fn reschedule(&self, key: EntryKey, due_at: DateTime<Utc>) -> Result<bool, QueueError>;

    /// Remove a live entry. Returns false if absent.
    fn remove(&self, key: EntryKey) -> Result<bool, QueueError>;

    /// Check whether a live entry exists for the key.
    fn contains(&self, key: EntryKey) -> Result<bool, QueueError>;

    /// Park all entries of a campaign at the paused sentinel, preserving
    /// retry counts. Returns the number of entries parked.
    fn pause_campaign(&self, id: CampaignId) -> Result<u64, QueueError>;

    /// Restore all entries of a campaign to `due_at`. Returns the number of
    /// entries released.
    fn resume_campaign(&self, id: CampaignId, due_at: DateTime<Utc>) -> Result<u64, QueueError>;

    /// Drop all entries of a campaign. Returns the number removed.
    fn purge_campaign(&self, id: CampaignId) -> Result<u64, QueueError>;

    /// Total live entries.
    fn depth(&self) -> Result<u64, QueueError>;

    /// Live entries for one campaign.
    fn campaign_depth(&self, id: CampaignId) -> Result<u64, QueueError>;

    /// Flush pending writes to disk (no-op for in-memory).
    fn flush(&self) -> Result<(), QueueError> {
        Ok(())
    }
}

/// Shared queue store handle.
pub type SharedQueue = Arc<dyn QueueStore>;
