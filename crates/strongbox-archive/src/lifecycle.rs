use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use strongbox_core::clock::Clock;
use strongbox_core::crypto::{decrypt_payload, encrypt_payload};
use strongbox_core::integrity::{compute_checksum, verify_checksum};
use strongbox_core::types::{
    BackupMetadata, BackupStats, EncryptedPayload, FORMAT_VERSION, KeyMaterial,
};
use strongbox_core::{ArchiveError, Result};
use strongbox_keys::provider::KeyProvider;
use strongbox_storage::provider::BackupStore;
use tracing::{debug, info, warn};

use crate::export;

/// Payloads at or above this size are encrypted/decrypted on the blocking pool.
const OFFLOAD_THRESHOLD: usize = 1024 * 1024;

/// Byte-level create/restore/verify/export/import/cleanup over a store,
/// a key provider and a clock.
pub struct BackupLifecycle {
    store: Arc<dyn BackupStore>,
    keys: Arc<dyn KeyProvider>,
    clock: Arc<dyn Clock>,
}

impl BackupLifecycle {
    pub fn new(
        store: Arc<dyn BackupStore>,
        keys: Arc<dyn KeyProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, keys, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn store(&self) -> &Arc<dyn BackupStore> {
        &self.store
    }

    async fn current_key(&self) -> Result<KeyMaterial> {
        self.keys
            .current_key()
            .await
            .map_err(|e| ArchiveError::KeyProvider(format!("{}: {e:#}", self.keys.name())))
    }

    /// Hash, encrypt and persist a serialized snapshot. Nothing is stored
    /// unless every step succeeds.
    pub async fn create_backup(
        &self,
        plaintext: Vec<u8>,
        description: Option<String>,
    ) -> Result<BackupMetadata> {
        let id = uuid::Uuid::now_v7().to_string();
        let key = self.current_key().await?;

        let checksum = compute_checksum(&plaintext);
        let payload = encrypt(plaintext, key, id.clone()).await?;

        let metadata = BackupMetadata {
            id,
            timestamp: self.clock.now(),
            size: payload.ciphertext.len() as u64,
            encrypted: true,
            compressed: false,
            checksum,
            version: FORMAT_VERSION.to_string(),
            description,
        };

        self.store.put(metadata.clone(), payload).await?;
        info!(
            backup_id = %metadata.id,
            size = metadata.size,
            store = self.store.name(),
            "Backup created"
        );
        Ok(metadata)
    }

    /// Fetch, decrypt and (optionally) checksum-verify a backup.
    ///
    /// `key_override` replaces the provider's key for this call only.
    pub async fn restore_backup(
        &self,
        id: &str,
        key_override: Option<KeyMaterial>,
        validate_checksum: bool,
    ) -> Result<Vec<u8>> {
        let stored = self.store.get(id).await?;
        let key = match key_override {
            Some(key) => key,
            None => self.current_key().await?,
        };

        let plaintext = decrypt(stored.payload, key, id.to_string())
            .await
            .inspect_err(|e| warn!(backup_id = %id, error = %e, "Backup failed authentication"))?;

        if validate_checksum && !verify_checksum(&plaintext, &stored.metadata.checksum) {
            warn!(backup_id = %id, "Checksum mismatch on restore");
            return Err(ArchiveError::Integrity(format!(
                "checksum mismatch for backup {id}"
            )));
        }

        debug!(backup_id = %id, bytes = plaintext.len(), "Backup restored");
        Ok(plaintext)
    }

    /// Decrypt and checksum a backup without returning its contents. Any
    /// failure, including a missing id, yields `false`.
    pub async fn verify_backup(&self, id: &str) -> bool {
        match self.restore_backup(id, None, true).await {
            Ok(_) => true,
            Err(e) => {
                debug!(backup_id = %id, error = %e, "Verification failed");
                false
            }
        }
    }

    /// Remove a backup. Returns `false` when it was already gone; store
    /// failures are logged and also reported as `false`.
    pub async fn delete_backup(&self, id: &str) -> bool {
        match self.store.delete(id).await {
            Ok(removed) => {
                if removed {
                    info!(backup_id = %id, "Backup deleted");
                }
                removed
            }
            Err(e) => {
                warn!(backup_id = %id, error = %e, "Delete failed");
                false
            }
        }
    }

    pub async fn list_backups(&self) -> Result<Vec<BackupMetadata>> {
        self.store.list().await
    }

    /// Delete every backup older than `retention_days`.
    ///
    /// The cutoff is fixed when the call starts and the id set is
    /// snapshotted before deleting, so backups created during the pass are
    /// never candidates.
    pub async fn cleanup_old_backups(&self, retention_days: u32) -> Result<usize> {
        let cutoff = retention_cutoff(self.clock.now(), retention_days);
        let expired: Vec<String> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|m| m.timestamp < cutoff)
            .map(|m| m.id)
            .collect();

        let mut deleted = 0usize;
        for id in &expired {
            if self.delete_backup(id).await {
                deleted += 1;
            }
        }

        info!(
            retention_days,
            cutoff = %cutoff.to_rfc3339(),
            deleted,
            "Retention cleanup finished"
        );
        Ok(deleted)
    }

    pub async fn backup_stats(&self) -> Result<BackupStats> {
        let listing = self.store.list().await?;
        Ok(BackupStats::from_listing(&listing))
    }

    /// Serialize one backup's metadata and encrypted payload to the portable
    /// export format. The payload is not re-encrypted.
    pub async fn export_backup(&self, id: &str) -> Result<String> {
        let stored = self.store.get(id).await?;
        let document = export::encode(&stored)?;
        info!(backup_id = %id, "Backup exported");
        Ok(document)
    }

    /// Parse an exported backup and store it under its original id.
    pub async fn import_backup(&self, exported: &str) -> Result<BackupMetadata> {
        let stored = export::decode(exported)?;
        let id = stored.metadata.id.clone();

        let duplicate = || {
            ArchiveError::Validation(format!("backup {id} already exists; refusing to overwrite"))
        };
        if self.store.contains(&id).await? {
            return Err(duplicate());
        }

        let metadata = stored.metadata.clone();
        if let Err(e) = self.store.put(stored.metadata, stored.payload).await {
            // Lost a race with a concurrent import of the same id.
            if matches!(e, ArchiveError::Storage(_)) && self.store.contains(&id).await? {
                return Err(duplicate());
            }
            return Err(e);
        }
        info!(backup_id = %id, "Backup imported");
        Ok(metadata)
    }
}

/// Oldest timestamp a backup may carry and survive `retention_days`.
/// Retention reaching past the representable range keeps everything.
pub fn retention_cutoff(now: DateTime<Utc>, retention_days: u32) -> DateTime<Utc> {
    Duration::try_days(i64::from(retention_days))
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

async fn encrypt(plaintext: Vec<u8>, key: KeyMaterial, aad: String) -> Result<EncryptedPayload> {
    if plaintext.len() < OFFLOAD_THRESHOLD {
        return encrypt_payload(&plaintext, &key, aad.as_bytes());
    }
    tokio::task::spawn_blocking(move || encrypt_payload(&plaintext, &key, aad.as_bytes()))
        .await
        .map_err(|e| ArchiveError::Encryption(format!("encryption task failed: {e}")))?
}

async fn decrypt(payload: EncryptedPayload, key: KeyMaterial, aad: String) -> Result<Vec<u8>> {
    if payload.ciphertext.len() < OFFLOAD_THRESHOLD {
        return decrypt_payload(&payload, &key, aad.as_bytes());
    }
    tokio::task::spawn_blocking(move || decrypt_payload(&payload, &key, aad.as_bytes()))
        .await
        .map_err(|e| ArchiveError::Encryption(format!("decryption task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use strongbox_core::clock::ManualClock;
    use strongbox_keys::static_key::StaticKeyProvider;
    use strongbox_storage::MemoryStore;

    fn lifecycle() -> (BackupLifecycle, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        ));
        let keys = Arc::new(StaticKeyProvider::new(KeyMaterial::new([3; 32])));
        (
            BackupLifecycle::new(store.clone(), keys, clock.clone()),
            store,
            clock,
        )
    }

    #[tokio::test]
    async fn create_restore_roundtrip() {
        let (lc, _, clock) = lifecycle();
        let meta = lc
            .create_backup(b"snapshot".to_vec(), Some("first".to_string()))
            .await
            .unwrap();

        assert!(meta.encrypted);
        assert!(!meta.compressed);
        assert_eq!(meta.size, 8);
        assert_eq!(meta.timestamp, clock.now());
        assert_eq!(meta.checksum, compute_checksum(b"snapshot"));
        assert_eq!(meta.version, FORMAT_VERSION);

        let restored = lc.restore_backup(&meta.id, None, true).await.unwrap();
        assert_eq!(restored, b"snapshot");
    }

    #[tokio::test]
    async fn checksum_mismatch_is_integrity_error() {
        let (lc, store, _) = lifecycle();
        let meta = lc.create_backup(b"data".to_vec(), None).await.unwrap();

        // Re-store with a checksum that does not belong to the plaintext.
        let mut stored = store.get(&meta.id).await.unwrap();
        store.delete(&meta.id).await.unwrap();
        stored.metadata.checksum = compute_checksum(b"other");
        store.put(stored.metadata, stored.payload).await.unwrap();

        let err = lc.restore_backup(&meta.id, None, true).await.unwrap_err();
        assert!(matches!(err, ArchiveError::Integrity(_)));
        assert!(!lc.verify_backup(&meta.id).await);

        // Skipping validation still returns the authentic plaintext.
        let bytes = lc.restore_backup(&meta.id, None, false).await.unwrap();
        assert_eq!(bytes, b"data");
    }

    #[tokio::test]
    async fn payload_moved_to_other_id_fails() {
        let (lc, store, _) = lifecycle();
        let a = lc.create_backup(b"aaa".to_vec(), None).await.unwrap();
        let b = lc.create_backup(b"bbb".to_vec(), None).await.unwrap();

        let stolen = store.get(&a.id).await.unwrap().payload;
        let victim = store.get(&b.id).await.unwrap().metadata;
        store.delete(&b.id).await.unwrap();
        store.put(victim, stolen).await.unwrap();

        assert!(matches!(
            lc.restore_backup(&b.id, None, true).await,
            Err(ArchiveError::Integrity(_))
        ));
    }

    #[tokio::test]
    async fn large_payload_uses_blocking_pool() {
        let (lc, _, _) = lifecycle();
        let data = vec![0x5a; OFFLOAD_THRESHOLD + 17];
        let meta = lc.create_backup(data.clone(), None).await.unwrap();
        assert_eq!(meta.size as usize, data.len());
        assert_eq!(lc.restore_backup(&meta.id, None, true).await.unwrap(), data);
    }

    #[tokio::test]
    async fn restore_missing_is_not_found() {
        let (lc, _, _) = lifecycle();
        assert!(matches!(
            lc.restore_backup("missing", None, true).await,
            Err(ArchiveError::NotFound(_))
        ));
        assert!(!lc.verify_backup("missing").await);
    }

    #[tokio::test]
    async fn huge_retention_keeps_everything() {
        let (lc, _, clock) = lifecycle();
        lc.create_backup(b"old".to_vec(), None).await.unwrap();
        clock.advance(Duration::days(3650));

        assert_eq!(lc.cleanup_old_backups(u32::MAX).await.unwrap(), 0);
        assert_eq!(lc.list_backups().await.unwrap().len(), 1);
        assert_eq!(
            retention_cutoff(clock.now(), u32::MAX),
            DateTime::<Utc>::MIN_UTC
        );
        assert_eq!(
            retention_cutoff(clock.now(), 30),
            clock.now() - Duration::days(30)
        );
    }

    #[tokio::test]
    async fn cleanup_uses_cutoff_at_call_time() {
        let (lc, _, clock) = lifecycle();
        let start = clock.now();
        let old = lc.create_backup(b"old".to_vec(), None).await.unwrap();
        clock.set(start + Duration::days(31));
        let fresh = lc.create_backup(b"fresh".to_vec(), None).await.unwrap();

        assert_eq!(lc.cleanup_old_backups(30).await.unwrap(), 1);
        assert!(!lc.store().contains(&old.id).await.unwrap());
        assert!(lc.store().contains(&fresh.id).await.unwrap());
        assert_eq!(lc.cleanup_old_backups(30).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn zero_retention_keeps_backups_from_this_instant() {
        let (lc, _, _) = lifecycle();
        lc.create_backup(b"now".to_vec(), None).await.unwrap();
        assert_eq!(lc.cleanup_old_backups(0).await.unwrap(), 0);
    }
}
