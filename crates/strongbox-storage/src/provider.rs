use async_trait::async_trait;
use strongbox_core::Result;
use strongbox_core::types::{BackupMetadata, EncryptedPayload, StoredBackup};

/// Keyed storage for backups: one metadata record and one encrypted payload
/// per id, always written and removed together.
///
/// Implementations serialize operations on the same id. Errors:
/// - `put` on an existing id → `ArchiveError::Storage` (ids are never reused)
/// - `get` on a missing id → `ArchiveError::NotFound`
#[async_trait]
pub trait BackupStore: Send + Sync {
    /// Store metadata and payload atomically.
    async fn put(&self, metadata: BackupMetadata, payload: EncryptedPayload) -> Result<()>;

    /// Fetch both records for `id`.
    async fn get(&self, id: &str) -> Result<StoredBackup>;

    /// Remove both records. Returns whether anything was removed.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Check whether `id` is present.
    async fn contains(&self, id: &str) -> Result<bool>;

    /// All metadata, newest first.
    async fn list(&self) -> Result<Vec<BackupMetadata>>;

    /// Store name for display.
    fn name(&self) -> &str;
}
