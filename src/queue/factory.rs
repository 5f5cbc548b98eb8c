//! Queue store factory.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{QueueBackend, QueueConfig};

use super::{MemoryQueueStore, PersistentQueueStore, SharedQueue};

fn resolve_data_dir(config_path: Option<&std::path::Path>) -> PathBuf {
    match config_path {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path),
        None => PathBuf::from("./data/campaignd"),
    }
}

/// Create a queue store backend based on configuration.
pub async fn create_queue_store(config: &QueueConfig) -> anyhow::Result<SharedQueue> {
    match config.backend {
        QueueBackend::Memory => {
            tracing::info!("using in-memory queue store (volatile)");
            Ok(Arc::new(MemoryQueueStore::new()))
        }
        QueueBackend::Fjall => {
            let data_dir = resolve_data_dir(config.fjall.path.as_deref());
            tracing::info!(path = %data_dir.display(), "using persistent queue store");
            Ok(PersistentQueueStore::open(&data_dir).await? as SharedQueue)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::{CampaignId, ContactId, TenantId};
    use crate::queue::{QueueEntry, QueueStore};
    use std::path::Path;

    #[test]
    fn test_resolve_data_dir_explicit_absolute() {
        let path = Path::new("/custom/data/path");
        assert_eq!(resolve_data_dir(Some(path)), path);
    }

    #[test]
    fn test_resolve_data_dir_explicit_relative() {
        let resolved = resolve_data_dir(Some(Path::new("./my-data")));
        assert!(resolved.ends_with("my-data"));
    }

    #[test]
    fn test_resolve_data_dir_default() {
        let resolved = resolve_data_dir(None);
        assert!(resolved.to_string_lossy().contains("campaignd"));
    }

    #[tokio::test]
    async fn test_create_memory_store() {
        let config = QueueConfig::memory();
        let store = create_queue_store(&config).await.unwrap();

        let entry = QueueEntry::new(
            CampaignId::from_u64(1),
            ContactId::from_u64(1),
            TenantId::from_u64(1),
            chrono::Utc::now(),
        );
        store.enqueue(entry).unwrap();
        assert_eq!(store.depth().unwrap(), 1);
    }
}
