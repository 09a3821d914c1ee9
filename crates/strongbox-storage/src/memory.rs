use async_trait::async_trait;
use std::collections::HashMap;
use strongbox_core::types::{BackupMetadata, EncryptedPayload, StoredBackup, sort_newest_first};
use strongbox_core::{ArchiveError, Result};
use tokio::sync::RwLock;

use crate::provider::BackupStore;

/// Process-local store. Metadata and payload sit in one map entry, so every
/// operation on an id is a single atomic map operation.
pub struct MemoryStore {
    records: RwLock<HashMap<String, StoredBackup>>,
    name: String,
}

impl MemoryStore {
    pub fn new(name: &str) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            name: name.to_string(),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

#[async_trait]
impl BackupStore for MemoryStore {
    async fn put(&self, metadata: BackupMetadata, payload: EncryptedPayload) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&metadata.id) {
            return Err(ArchiveError::Storage(format!(
                "backup {} already exists",
                metadata.id
            )));
        }
        records.insert(metadata.id.clone(), StoredBackup { metadata, payload });
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<StoredBackup> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ArchiveError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.records.write().await.remove(id).is_some())
    }

    async fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.records.read().await.contains_key(id))
    }

    async fn list(&self) -> Result<Vec<BackupMetadata>> {
        let mut listing: Vec<BackupMetadata> = self
            .records
            .read()
            .await
            .values()
            .map(|r| r.metadata.clone())
            .collect();
        sort_newest_first(&mut listing);
        Ok(listing)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample, sample_at};

    #[tokio::test]
    async fn put_get_delete_roundtrip() {
        let store = MemoryStore::default();
        let (meta, payload) = sample("a");

        store.put(meta.clone(), payload.clone()).await.unwrap();
        assert!(store.contains("a").await.unwrap());

        let fetched = store.get("a").await.unwrap();
        assert_eq!(fetched.metadata, meta);
        assert_eq!(fetched.payload, payload);

        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn duplicate_put_is_storage_error() {
        let store = MemoryStore::default();
        let (meta, payload) = sample("a");
        store.put(meta.clone(), payload.clone()).await.unwrap();

        let err = store.put(meta, payload).await.unwrap_err();
        assert!(matches!(err, ArchiveError::Storage(_)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = MemoryStore::default();
        assert!(matches!(
            store.get("nope").await,
            Err(ArchiveError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_sorted_newest_first() {
        let store = MemoryStore::default();
        for (id, days_ago) in [("old", 40), ("new", 1), ("mid", 20)] {
            let (meta, payload) = sample_at(id, days_ago);
            store.put(meta, payload).await.unwrap();
        }
        let ids: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, ["new", "mid", "old"]);
    }
}
