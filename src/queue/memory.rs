//! In-memory queue store implementation.
//!
//! Volatile storage for development and testing. All entries are lost on
//! restart. A single RwLock guards both the primary map and the due-time
//! index, so claims are atomic.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::campaign::CampaignId;

use super::types::{paused_due, EntryKey, QueueEntry, QueueError};
use super::QueueStore;

struct Slot {
    entry: QueueEntry,
    seq: u64,
}

#[derive(Default)]
struct Inner {
    /// Primary storage, keyed by entry identity
    entries: HashMap<EntryKey, Slot>,
    /// Due-time index: (due epoch ms, insertion seq) -> identity
    by_due: BTreeMap<(i64, u64), EntryKey>,
}

/// In-memory queue store.
pub struct MemoryQueueStore {
    inner: RwLock<Inner>,
    seq: AtomicU64,
}

impl MemoryQueueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            seq: AtomicU64::new(0),
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for MemoryQueueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn insert(&mut self, entry: QueueEntry, seq: u64) {
        let key = entry.key();
        if let Some(old) = self.entries.remove(&key) {
            self.by_due
                .remove(&(old.entry.due_at.timestamp_millis(), old.seq));
        }
        self.by_due.insert((entry.due_at.timestamp_millis(), seq), key);
        self.entries.insert(key, Slot { entry, seq });
    }

    fn remove(&mut self, key: EntryKey) -> Option<QueueEntry> {
        let slot = self.entries.remove(&key)?;
        self.by_due
            .remove(&(slot.entry.due_at.timestamp_millis(), slot.seq));
        Some(slot.entry)
    }

    fn campaign_keys(&self, id: CampaignId) -> Vec<EntryKey> {
        self.entries
            .keys()
            .filter(|k| k.campaign_id == id)
            .copied()
            .collect()
    }
}

impl QueueStore for MemoryQueueStore {
    fn enqueue(&self, entry: QueueEntry) -> Result<(), QueueError> {
        let seq = self.next_seq();
        self.inner.write().unwrap().insert(entry, seq);
        Ok(())
    }

    fn dequeue_due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<QueueEntry>, QueueError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut inner = self.inner.write().unwrap();
        let now_ms = now.timestamp_millis();

        let due_keys: Vec<EntryKey> = inner
            .by_due
            .range(..=(now_ms, u64::MAX))
            .take(limit)
            .map(|(_, key)| *key)
            .collect();

        let mut claimed = Vec::with_capacity(due_keys.len());
        for key in due_keys {
            if let Some(entry) = inner.remove(key) {
                claimed.push(entry);
            }
        }

        if !claimed.is_empty() {
            debug!(count = claimed.len(), "dequeued due entries");
        }

        Ok(claimed)
    }

    fn reschedule(&self, key: EntryKey, due_at: DateTime<Utc>) -> Result<bool, QueueError> {
        let seq = self.next_seq();
        let mut inner = self.inner.write().unwrap();
        match inner.remove(key) {
            Some(mut entry) => {
                entry.due_at = due_at;
                inner.insert(entry, seq);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn remove(&self, key: EntryKey) -> Result<bool, QueueError> {
        Ok(self.inner.write().unwrap().remove(key).is_some())
    }

    fn contains(&self, key: EntryKey) -> Result<bool, QueueError> {
        Ok(self.inner.read().unwrap().entries.contains_key(&key))
    }

    fn pause_campaign(&self, id: CampaignId) -> Result<u64, QueueError> {
        let sentinel = paused_due();
        let mut inner = self.inner.write().unwrap();
        let keys = inner.campaign_keys(id);
        let mut parked = 0u64;
        for key in keys {
            if let Some(mut entry) = inner.remove(key) {
                entry.due_at = sentinel;
                let seq = self.next_seq();
                inner.insert(entry, seq);
                parked += 1;
            }
        }
        Ok(parked)
    }

    fn resume_campaign(&self, id: CampaignId, due_at: DateTime<Utc>) -> Result<u64, QueueError> {
        let mut inner = self.inner.write().unwrap();
        let keys = inner.campaign_keys(id);
        let mut released = 0u64;
        for key in keys {
            if let Some(mut entry) = inner.remove(key) {
                entry.due_at = due_at;
                let seq = self.next_seq();
                inner.insert(entry, seq);
                released += 1;
            }
        }
        Ok(released)
    }

    fn purge_campaign(&self, id: CampaignId) -> Result<u64, QueueError> {
        let mut inner = self.inner.write().unwrap();
        let keys = inner.campaign_keys(id);
        let mut purged = 0u64;
        for key in keys {
            if inner.remove(key).is_some() {
                purged += 1;
            }
        }
        Ok(purged)
    }

    fn depth(&self) -> Result<u64, QueueError> {
        Ok(self.inner.read().unwrap().entries.len() as u64)
    }

    fn campaign_depth(&self, id: CampaignId) -> Result<u64, QueueError> {
        Ok(self.inner.read().unwrap().campaign_keys(id).len() as u64)
    }
}
