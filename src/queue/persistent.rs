//! Persistent queue store using fjall (pure Rust LSM-tree).
//!
//! Durable storage for production use. Entries survive restarts, which is
//! what makes at-most-once delivery hold across crashes: claimed work is
//! removed before it is sent, never after.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use serde::{Deserialize, Serialize};

use crate::campaign::{CampaignId, ContactId, TenantId};

use super::types::{paused_due, EntryKey, QueueEntry, QueueError};
use super::QueueStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedEntry {
    campaign_id: u64,
    contact_id: u64,
    tenant_id: u64,
    due_ms: i64,
    retry_count: u32,
    seq: u64,
}

impl PersistedEntry {
    fn to_entry(&self) -> QueueEntry {
        QueueEntry {
            campaign_id: CampaignId::from_u64(self.campaign_id),
            contact_id: ContactId::from_u64(self.contact_id),
            tenant_id: TenantId::from_u64(self.tenant_id),
            due_at: DateTime::from_timestamp_millis(self.due_ms).unwrap_or_else(paused_due),
            retry_count: self.retry_count,
        }
    }
}

/// Persistent queue store backed by a fjall keyspace.
///
/// Two partitions: `entries` holds the serialized entry keyed by identity,
/// `due_idx` orders identities by (due epoch ms, insertion seq) using
/// big-endian composite keys so iteration yields earliest-due first.
/// Mutations run under one claim lock so no entry is returned to two
/// dequeuers.
pub struct PersistentQueueStore {
    keyspace: Keyspace,
    entries: PartitionHandle,
    due_idx: PartitionHandle,
    claim_lock: Mutex<()>,
    seq: AtomicU64,
}

fn entry_key(key: EntryKey) -> String {
    format!(
        "entry_{}_{}",
        key.campaign_id.as_u64(),
        key.contact_id.as_u64()
    )
}

fn campaign_prefix(id: CampaignId) -> String {
    format!("entry_{}_", id.as_u64())
}

fn idx_key(due_ms: i64, seq: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&(due_ms as u64).to_be_bytes());
    key[8..].copy_from_slice(&seq.to_be_bytes());
    key
}

fn unavailable(e: impl std::fmt::Display) -> QueueError {
    QueueError::Unavailable(e.to_string())
}

fn codec(e: impl std::fmt::Display) -> QueueError {
    QueueError::Codec(e.to_string())
}

impl PersistentQueueStore {
    /// Open or create a persistent queue store at the given path.
    pub async fn open(path: &Path) -> anyhow::Result<Arc<Self>> {
        std::fs::create_dir_all(path)?;

        let keyspace = Config::new(path).open()?;
        let entries = keyspace.open_partition("entries", PartitionCreateOptions::default())?;
        let due_idx = keyspace.open_partition("due_idx", PartitionCreateOptions::default())?;

        let store = Arc::new(Self {
            keyspace,
            entries,
            due_idx,
            claim_lock: Mutex::new(()),
            seq: AtomicU64::new(0),
        });

        store.recover_seq()?;

        tracing::info!(
            path = %path.display(),
            depth = store.entries.len().unwrap_or(0),
            "persistent queue store opened"
        );

        Ok(store)
    }

    fn recover_seq(&self) -> anyhow::Result<()> {
        let mut max_seq = 0u64;
        for item in self.due_idx.iter() {
            let (key, _) = item?;
            if key.len() == 16 {
                let seq = u64::from_be_bytes(key[8..16].try_into()?);
                max_seq = max_seq.max(seq);
            }
        }
        self.seq.store(max_seq + 1, Ordering::SeqCst);
        tracing::debug!(max_seq, "recovered queue sequence counter");
        Ok(())
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    fn load(&self, key: EntryKey) -> Result<Option<PersistedEntry>, QueueError> {
        let value = self
            .entries
            .get(entry_key(key).as_bytes())
            .map_err(unavailable)?;
        match value {
            Some(value) => Ok(Some(serde_json::from_slice(&value).map_err(codec)?)),
            None => Ok(None),
        }
    }

    fn write(&self, persisted: &PersistedEntry) -> Result<(), QueueError> {
        let key = entry_key(EntryKey::new(
            CampaignId::from_u64(persisted.campaign_id),
            ContactId::from_u64(persisted.contact_id),
        ));
        let value = serde_json::to_vec(persisted).map_err(codec)?;
        self.entries
            .insert(key.as_bytes(), &value)
            .map_err(unavailable)?;
        self.due_idx
            .insert(idx_key(persisted.due_ms, persisted.seq), key.as_bytes())
            .map_err(unavailable)?;
        Ok(())
    }

    fn delete(&self, persisted: &PersistedEntry) -> Result<(), QueueError> {
        let key = entry_key(EntryKey::new(
            CampaignId::from_u64(persisted.campaign_id),
            ContactId::from_u64(persisted.contact_id),
        ));
        self.due_idx
            .remove(idx_key(persisted.due_ms, persisted.seq))
            .map_err(unavailable)?;
        self.entries.remove(key.as_bytes()).map_err(unavailable)?;
        Ok(())
    }

    fn campaign_entries(&self, id: CampaignId) -> Result<Vec<PersistedEntry>, QueueError> {
        let mut found = Vec::new();
        for item in self.entries.prefix(campaign_prefix(id).as_bytes()) {
            let (_, value) = item.map_err(unavailable)?;
            found.push(serde_json::from_slice(&value).map_err(codec)?);
        }
        Ok(found)
    }

    fn move_campaign(
        &self,
        id: CampaignId,
        due_at: DateTime<Utc>,
    ) -> Result<u64, QueueError> {
        let _guard = self.claim_lock.lock().unwrap();
        let due_ms = due_at.timestamp_millis();
        let mut moved = 0u64;
        for mut persisted in self.campaign_entries(id)? {
            self.due_idx
                .remove(idx_key(persisted.due_ms, persisted.seq))
                .map_err(unavailable)?;
            persisted.due_ms = due_ms;
            self.write(&persisted)?;
            moved += 1;
        }
        Ok(moved)
    }
}

impl QueueStore for PersistentQueueStore {
    fn enqueue(&self, entry: QueueEntry) -> Result<(), QueueError> {
        let _guard = self.claim_lock.lock().unwrap();

        // Upsert: drop the previous index slot before writing the new one.
        if let Some(old) = self.load(entry.key())? {
            self.due_idx
                .remove(idx_key(old.due_ms, old.seq))
                .map_err(unavailable)?;
        }

        let persisted = PersistedEntry {
            campaign_id: entry.campaign_id.as_u64(),
            contact_id: entry.contact_id.as_u64(),
            tenant_id: entry.tenant_id.as_u64(),
            due_ms: entry.due_at.timestamp_millis(),
            retry_count: entry.retry_count,
            seq: self.next_seq(),
        };
        self.write(&persisted)
    }

    fn dequeue_due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<QueueEntry>, QueueError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let _guard = self.claim_lock.lock().unwrap();
        let now_ms = now.timestamp_millis();

        let mut claimed = Vec::new();
        let mut dangling: Vec<Vec<u8>> = Vec::new();
        for item in self.due_idx.iter() {
            if claimed.len() >= limit {
                break;
            }
            let (key, value) = item.map_err(unavailable)?;
            if key.len() != 16 {
                continue;
            }
            let due_ms = u64::from_be_bytes(key[..8].try_into().unwrap_or_default()) as i64;
            if due_ms > now_ms {
                break;
            }

            let entry_value = self.entries.get(&value).map_err(unavailable)?;
            let Some(entry_value) = entry_value else {
                // Index slot without a live entry; clean it up after the scan.
                dangling.push(key.to_vec());
                continue;
            };
            let persisted: PersistedEntry =
                serde_json::from_slice(&entry_value).map_err(codec)?;
            claimed.push(persisted);
        }

        for key in dangling {
            self.due_idx.remove(key).map_err(unavailable)?;
        }

        let mut entries = Vec::with_capacity(claimed.len());
        for persisted in claimed {
            self.delete(&persisted)?;
            entries.push(persisted.to_entry());
        }
        Ok(entries)
    }

    fn reschedule(&self, key: EntryKey, due_at: DateTime<Utc>) -> Result<bool, QueueError> {
        let _guard = self.claim_lock.lock().unwrap();
        match self.load(key)? {
            Some(mut persisted) => {
                self.due_idx
                    .remove(idx_key(persisted.due_ms, persisted.seq))
                    .map_err(unavailable)?;
                persisted.due_ms = due_at.timestamp_millis();
                persisted.seq = self.next_seq();
                self.write(&persisted)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn remove(&self, key: EntryKey) -> Result<bool, QueueError> {
        let _guard = self.claim_lock.lock().unwrap();
        match self.load(key)? {
            Some(persisted) => {
                self.delete(&persisted)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn contains(&self, key: EntryKey) -> Result<bool, QueueError> {
        Ok(self.load(key)?.is_some())
    }

    fn pause_campaign(&self, id: CampaignId) -> Result<u64, QueueError> {
        self.move_campaign(id, paused_due())
    }

    fn resume_campaign(&self, id: CampaignId, due_at: DateTime<Utc>) -> Result<u64, QueueError> {
        self.move_campaign(id, due_at)
    }

    fn purge_campaign(&self, id: CampaignId) -> Result<u64, QueueError> {
        let _guard = self.claim_lock.lock().unwrap();
        let mut purged = 0u64;
        for persisted in self.campaign_entries(id)? {
            self.delete(&persisted)?;
            purged += 1;
        }
        Ok(purged)
    }

    fn depth(&self) -> Result<u64, QueueError> {
        Ok(self.entries.len().map_err(unavailable)? as u64)
    }

    fn campaign_depth(&self, id: CampaignId) -> Result<u64, QueueError> {
        Ok(self.campaign_entries(id)?.len() as u64)
    }

    fn flush(&self) -> Result<(), QueueError> {
        self.keyspace
            .persist(fjall::PersistMode::SyncAll)
            .map_err(unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (Arc<PersistentQueueStore>, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = PersistentQueueStore::open(temp.path()).await.unwrap();
        (store, temp)
    }

    fn entry(campaign: u64, contact: u64, due: DateTime<Utc>) -> QueueEntry {
        QueueEntry::new(
            CampaignId::from_u64(campaign),
            ContactId::from_u64(contact),
            TenantId::from_u64(1),
            due,
        )
    }

    #[tokio::test]
    async fn test_enqueue_dequeue_ordering() {
        let (store, _temp) = create_test_store().await;
        let now = Utc::now();

        store
            .enqueue(entry(1, 2, now + chrono::Duration::seconds(5)))
            .unwrap();
        store.enqueue(entry(1, 1, now)).unwrap();
        store
            .enqueue(entry(1, 3, now + chrono::Duration::hours(1)))
            .unwrap();

        let due = store
            .dequeue_due(now + chrono::Duration::seconds(10), 10)
            .unwrap();
        let ids: Vec<u64> = due.iter().map(|e| e.contact_id.as_u64()).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(store.depth().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let (store, _temp) = create_test_store().await;
        let now = Utc::now();

        store.enqueue(entry(1, 1, now)).unwrap();
        store
            .enqueue(entry(1, 1, now).with_retry_count(3))
            .unwrap();

        assert_eq!(store.depth().unwrap(), 1);
        let due = store.dequeue_due(now, 10).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].retry_count, 3);
    }

    #[tokio::test]
    async fn test_pause_resume_purge() {
        let (store, _temp) = create_test_store().await;
        let now = Utc::now();

        store.enqueue(entry(1, 1, now).with_retry_count(1)).unwrap();
        store.enqueue(entry(1, 2, now)).unwrap();
        store.enqueue(entry(2, 3, now)).unwrap();

        assert_eq!(store.pause_campaign(CampaignId::from_u64(1)).unwrap(), 2);
        assert_eq!(store.dequeue_due(now, 10).unwrap().len(), 1);

        assert_eq!(
            store.resume_campaign(CampaignId::from_u64(1), now).unwrap(),
            2
        );
        let due = store.dequeue_due(now, 10).unwrap();
        assert_eq!(due.len(), 2);
        assert!(due.iter().any(|e| e.retry_count == 1));

        store.enqueue(entry(1, 4, now)).unwrap();
        assert_eq!(store.purge_campaign(CampaignId::from_u64(1)).unwrap(), 1);
        assert_eq!(store.depth().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_entries_survive_restart() {
        let temp = TempDir::new().unwrap();
        let now = Utc::now();

        {
            let store = PersistentQueueStore::open(temp.path()).await.unwrap();
            store.enqueue(entry(1, 1, now).with_retry_count(2)).unwrap();
            store
                .enqueue(entry(1, 2, now + chrono::Duration::minutes(5)))
                .unwrap();
            store.flush().unwrap();
        }

        {
            let store = PersistentQueueStore::open(temp.path()).await.unwrap();
            assert_eq!(store.depth().unwrap(), 2);

            let due = store.dequeue_due(now, 10).unwrap();
            assert_eq!(due.len(), 1);
            assert_eq!(due[0].contact_id.as_u64(), 1);
            assert_eq!(due[0].retry_count, 2);

            // New entries keep sorting after the recovered sequence counter.
            store.enqueue(entry(1, 3, now)).unwrap();
            let due = store.dequeue_due(now, 10).unwrap();
            assert_eq!(due.len(), 1);
            assert_eq!(due[0].contact_id.as_u64(), 3);
        }
    }

    #[tokio::test]
    async fn test_remove_and_contains() {
        let (store, _temp) = create_test_store().await;
        let now = Utc::now();
        let key = EntryKey::new(CampaignId::from_u64(1), ContactId::from_u64(1));

        store.enqueue(entry(1, 1, now)).unwrap();
        assert!(store.contains(key).unwrap());
        assert!(store.remove(key).unwrap());
        assert!(!store.contains(key).unwrap());
        assert!(!store.remove(key).unwrap());
        assert!(store.dequeue_due(now, 10).unwrap().is_empty());
    }
}
