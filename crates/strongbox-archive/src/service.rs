use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use strongbox_core::clock::{Clock, SystemClock};
use strongbox_core::codec::{JsonCodec, SnapshotCodec};
use strongbox_core::config::{
    ArchiveSettings, MAX_AUTO_BACKUP_MINUTES, StorageBackend, StrongboxConfig, auto_backup_period,
};
use strongbox_core::types::{BackupMetadata, BackupStats, KeyMaterial};
use strongbox_core::{ArchiveError, Result};
use strongbox_keys::factory::create_key_provider;
use strongbox_keys::provider::KeyProvider;
use strongbox_keys::static_key::StaticKeyProvider;
use strongbox_storage::{BackupStore, MemoryStore, SqliteStore};

use crate::lifecycle::BackupLifecycle;
use crate::schedule::{AutoBackupHandle, spawn_schedule};

/// Options for [`BackupArchiveService::restore_backup`].
#[derive(Clone)]
pub struct RestoreOptions {
    pub backup_id: String,
    /// Hex key to use instead of the service key for this restore.
    pub decryption_key: Option<String>,
    /// Compare the plaintext against the stored checksum (default true).
    pub validate_checksum: bool,
    /// Keep only these top-level fields of an object snapshot.
    pub partial_restore: Option<Vec<String>>,
}

impl RestoreOptions {
    pub fn new(backup_id: impl Into<String>) -> Self {
        Self {
            backup_id: backup_id.into(),
            decryption_key: None,
            validate_checksum: true,
            partial_restore: None,
        }
    }

    pub fn with_decryption_key(mut self, key_hex: impl Into<String>) -> Self {
        self.decryption_key = Some(key_hex.into());
        self
    }

    pub fn skip_checksum(mut self) -> Self {
        self.validate_checksum = false;
        self
    }

    pub fn only_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partial_restore = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

impl fmt::Debug for RestoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestoreOptions")
            .field("backup_id", &self.backup_id)
            .field(
                "decryption_key",
                &self.decryption_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("validate_checksum", &self.validate_checksum)
            .field("partial_restore", &self.partial_restore)
            .finish()
    }
}

/// Public entry point of the archive: typed snapshots in, metadata out, and
/// back again. Cheap to clone; clones share the same store and key.
#[derive(Clone)]
pub struct BackupArchiveService {
    lifecycle: Arc<BackupLifecycle>,
    codec: Arc<dyn SnapshotCodec>,
    settings: ArchiveSettings,
}

/// Wires a [`BackupArchiveService`] from its collaborators. Anything not set
/// falls back to an in-memory store, the system clock, JSON, and a key
/// derived from `settings.encryption_key` (or generated).
#[derive(Default)]
pub struct ServiceBuilder {
    settings: ArchiveSettings,
    store: Option<Arc<dyn BackupStore>>,
    keys: Option<Arc<dyn KeyProvider>>,
    clock: Option<Arc<dyn Clock>>,
    codec: Option<Arc<dyn SnapshotCodec>>,
}

impl ServiceBuilder {
    pub fn settings(mut self, settings: ArchiveSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn store(mut self, store: Arc<dyn BackupStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn key_provider(mut self, keys: Arc<dyn KeyProvider>) -> Self {
        self.keys = Some(keys);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn codec(mut self, codec: Arc<dyn SnapshotCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn build(self) -> Result<BackupArchiveService> {
        if let Some(minutes) = self.settings.auto_backup_interval {
            auto_backup_period(minutes)?;
        }
        let keys: Arc<dyn KeyProvider> = match self.keys {
            Some(keys) => keys,
            None => match self.settings.encryption_key {
                Some(ref hex) => Arc::new(StaticKeyProvider::from_hex(hex)?),
                None => Arc::new(StaticKeyProvider::generate()),
            },
        };
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::default()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let codec = self.codec.unwrap_or_else(|| Arc::new(JsonCodec));

        tracing::debug!(
            store = store.name(),
            key_provider = keys.name(),
            codec = codec.name(),
            "Archive service ready"
        );
        Ok(BackupArchiveService {
            lifecycle: Arc::new(BackupLifecycle::new(store, keys, clock)),
            codec,
            settings: self.settings,
        })
    }
}

impl BackupArchiveService {
    /// In-memory service keyed from `settings.encryption_key`, or with a
    /// generated key that lives only as long as this instance.
    pub fn new(settings: ArchiveSettings) -> Result<Self> {
        Self::builder().settings(settings).build()
    }

    pub fn builder() -> ServiceBuilder {
        ServiceBuilder::default()
    }

    /// Build from a full config file: storage backend and key provider
    /// included. `passphrase` is required by the `local` key provider.
    pub fn from_config(config: &StrongboxConfig, passphrase: Option<&[u8]>) -> Result<Self> {
        config.validate()?;
        let store: Arc<dyn BackupStore> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(MemoryStore::default()),
            StorageBackend::Sqlite => Arc::new(SqliteStore::open(Path::new(
                &config.storage.db_path,
            ))?),
        };
        if config.keys.provider == "local" && passphrase.is_none() {
            return Err(ArchiveError::Validation(
                "the local key provider requires a passphrase".to_string(),
            ));
        }
        let keys = create_key_provider(
            &config.keys.provider,
            config.archive.encryption_key.as_deref(),
            passphrase,
            &config.keys.keyfile_path,
        )
        .map_err(|e| ArchiveError::KeyProvider(format!("{e:#}")))?;

        Self::builder()
            .settings(config.archive.clone())
            .store(store)
            .key_provider(Arc::from(keys))
            .build()
    }

    pub fn settings(&self) -> &ArchiveSettings {
        &self.settings
    }

    /// Serialize `data`, encrypt it and store it as a new backup.
    pub async fn create_backup<T>(&self, data: &T, description: Option<&str>) -> Result<BackupMetadata>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(data)?;
        let plaintext = self.codec.encode(&value)?;
        self.lifecycle
            .create_backup(plaintext, description.map(str::to_string))
            .await
    }

    /// Decrypt, verify and deserialize a backup.
    pub async fn restore_backup<T>(&self, options: RestoreOptions) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let key_override = options
            .decryption_key
            .as_deref()
            .map(KeyMaterial::from_hex)
            .transpose()?;

        let plaintext = self
            .lifecycle
            .restore_backup(&options.backup_id, key_override, options.validate_checksum)
            .await?;

        let mut value = self.codec.decode(&plaintext)?;
        if let Some(ref fields) = options.partial_restore {
            value = project_fields(value, fields)?;
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Restore with default options.
    pub async fn restore<T>(&self, backup_id: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.restore_backup(RestoreOptions::new(backup_id)).await
    }

    pub async fn delete_backup(&self, backup_id: &str) -> bool {
        self.lifecycle.delete_backup(backup_id).await
    }

    /// All backups, newest first.
    pub async fn list_backups(&self) -> Result<Vec<BackupMetadata>> {
        self.lifecycle.list_backups().await
    }

    pub async fn cleanup_old_backups(&self, retention_days: u32) -> Result<usize> {
        self.lifecycle.cleanup_old_backups(retention_days).await
    }

    /// Cleanup using the configured `retention_days`.
    pub async fn cleanup_expired(&self) -> Result<usize> {
        self.cleanup_old_backups(self.settings.retention_days).await
    }

    pub async fn verify_backup(&self, backup_id: &str) -> bool {
        self.lifecycle.verify_backup(backup_id).await
    }

    pub async fn backup_stats(&self) -> Result<BackupStats> {
        self.lifecycle.backup_stats().await
    }

    pub async fn export_backup(&self, backup_id: &str) -> Result<String> {
        self.lifecycle.export_backup(backup_id).await
    }

    pub async fn import_backup(&self, exported: &str) -> Result<BackupMetadata> {
        self.lifecycle.import_backup(exported).await
    }

    /// Back up `data_provider()` every `interval_minutes`.
    pub fn schedule_auto_backup<F, T>(
        &self,
        data_provider: F,
        interval_minutes: u64,
    ) -> Result<AutoBackupHandle>
    where
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
        T: Serialize + Send + 'static,
    {
        let period = auto_backup_period(interval_minutes)?;
        self.schedule_auto_backup_every(data_provider, period)
    }

    /// Like [`Self::schedule_auto_backup`] with an arbitrary period, which
    /// must be non-zero and no longer than [`MAX_AUTO_BACKUP_MINUTES`].
    pub fn schedule_auto_backup_every<F, T>(
        &self,
        data_provider: F,
        period: Duration,
    ) -> Result<AutoBackupHandle>
    where
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
        T: Serialize + Send + 'static,
    {
        if period.is_zero() || period > Duration::from_secs(MAX_AUTO_BACKUP_MINUTES * 60) {
            return Err(ArchiveError::Validation(format!(
                "auto-backup period {period:?} is out of range"
            )));
        }
        let service = self.clone();
        let data_provider = Arc::new(data_provider);
        Ok(spawn_schedule(period, move || {
            let service = service.clone();
            let data_provider = data_provider.clone();
            async move {
                let data = (*data_provider)().map_err(|e| {
                    ArchiveError::Validation(format!("auto-backup data provider failed: {e:#}"))
                })?;
                let value = serde_json::to_value(&data)?;
                let description = format!("Auto backup at {}", service.lifecycle.now().to_rfc3339());
                service.create_backup(&value, Some(&description)).await
            }
        }))
    }

    /// Start the schedule from `auto_backup_interval`, if one is configured.
    pub fn start_configured_auto_backup<F, T>(&self, data_provider: F) -> Result<Option<AutoBackupHandle>>
    where
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
        T: Serialize + Send + 'static,
    {
        match self.settings.auto_backup_interval {
            Some(minutes) => self.schedule_auto_backup(data_provider, minutes).map(Some),
            None => Ok(None),
        }
    }
}

fn project_fields(value: Value, fields: &[String]) -> Result<Value> {
    match value {
        Value::Object(mut map) => {
            map.retain(|k, _| fields.iter().any(|f| f == k));
            Ok(Value::Object(map))
        }
        _ => Err(ArchiveError::Validation(
            "partial restore requires an object snapshot".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn projection_keeps_listed_fields() {
        let value = json!({"users": [1], "orders": [2], "meta": {"v": 1}});
        let projected = project_fields(value, &["users".to_string(), "meta".to_string()]).unwrap();
        assert_eq!(projected, json!({"users": [1], "meta": {"v": 1}}));
    }

    #[test]
    fn projection_of_array_fails() {
        let err = project_fields(json!([1, 2]), &["a".to_string()]).unwrap_err();
        assert!(matches!(err, ArchiveError::Validation(_)));
    }

    #[test]
    fn restore_options_debug_redacts_key() {
        let opts = RestoreOptions::new("id").with_decryption_key("ab".repeat(32));
        let debug = format!("{opts:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("abab"));
        assert!(opts.validate_checksum);
    }

    #[test]
    fn zero_interval_config_rejected() {
        let settings = ArchiveSettings {
            auto_backup_interval: Some(0),
            ..ArchiveSettings::default()
        };
        assert!(matches!(
            BackupArchiveService::new(settings),
            Err(ArchiveError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn malformed_configured_key_rejected() {
        let settings = ArchiveSettings {
            encryption_key: Some("xyz".to_string()),
            ..ArchiveSettings::default()
        };
        assert!(BackupArchiveService::new(settings).is_err());
    }
}
