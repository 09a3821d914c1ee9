use crate::error::{ArchiveError, Result};
use crate::types::KeyMaterial;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level Strongbox configuration stored as TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrongboxConfig {
    #[serde(default)]
    pub archive: ArchiveSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub keys: KeySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveSettings {
    /// Hex-encoded 256-bit key. When absent the key provider supplies one.
    #[serde(default)]
    pub encryption_key: Option<String>,
    /// Age in days after which `cleanup` removes a backup.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Minutes between automatic backups. Unset disables them.
    #[serde(default)]
    pub auto_backup_interval: Option<u64>,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            encryption_key: None,
            retention_days: default_retention_days(),
            auto_backup_interval: None,
        }
    }
}

fn default_retention_days() -> u32 {
    30
}

/// Longest supported auto-backup interval: one year.
pub const MAX_AUTO_BACKUP_MINUTES: u64 = 365 * 24 * 60;

/// Convert an auto-backup interval in minutes to a timer period.
pub fn auto_backup_period(minutes: u64) -> Result<std::time::Duration> {
    if !(1..=MAX_AUTO_BACKUP_MINUTES).contains(&minutes) {
        return Err(ArchiveError::Validation(format!(
            "auto_backup_interval must be between 1 and {MAX_AUTO_BACKUP_MINUTES} minutes, got {minutes}"
        )));
    }
    Ok(std::time::Duration::from_secs(minutes * 60))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    /// Path to the SQLite database (sqlite backend only).
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            db_path: default_db_path(),
        }
    }
}

fn default_backend() -> StorageBackend {
    StorageBackend::Sqlite
}

fn default_db_path() -> String {
    "strongbox.db".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeySettings {
    /// Key provider type ("static" or "local").
    #[serde(default = "default_key_provider")]
    pub provider: String,
    /// Path to the passphrase-protected keyfile (local provider).
    #[serde(default = "default_keyfile_path")]
    pub keyfile_path: String,
}

impl Default for KeySettings {
    fn default() -> Self {
        Self {
            provider: default_key_provider(),
            keyfile_path: default_keyfile_path(),
        }
    }
}

fn default_key_provider() -> String {
    "static".to_string()
}

fn default_keyfile_path() -> String {
    "keys.enc".to_string()
}

impl StrongboxConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ArchiveError::ConfigNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| ArchiveError::TomlDe(e.to_string()))?;
        config.validate()?;
        tracing::debug!(path = %path.display(), backend = ?config.storage.backend, "loaded config");
        Ok(config)
    }

    /// Save config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ArchiveError::TomlSer(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values that would only fail later, at first use.
    pub fn validate(&self) -> Result<()> {
        if let Some(ref key) = self.archive.encryption_key {
            KeyMaterial::from_hex(key)?;
        }
        if let Some(minutes) = self.archive.auto_backup_interval {
            auto_backup_period(minutes)?;
        }
        match self.keys.provider.as_str() {
            "static" | "local" => {}
            other => {
                return Err(ArchiveError::Validation(format!(
                    "Unknown key provider: {other}"
                )));
            }
        }
        Ok(())
    }

    /// Default config for `strongbox init`.
    pub fn default_config(base_dir: &Path) -> Self {
        Self {
            archive: ArchiveSettings::default(),
            storage: StorageSettings {
                backend: StorageBackend::Sqlite,
                db_path: base_dir.join("strongbox.db").display().to_string(),
            },
            keys: KeySettings {
                provider: "local".to_string(),
                keyfile_path: base_dir.join("keys.enc").display().to_string(),
            },
        }
    }

    /// Resolve the config file path: `<base_dir>/strongbox.toml`
    pub fn default_path(base_dir: &Path) -> PathBuf {
        base_dir.join("strongbox.toml")
    }

    /// Resolve the default strongbox home directory: `~/.strongbox`
    pub fn default_base_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|h| h.join(".strongbox"))
            .ok_or_else(|| ArchiveError::Config("Cannot determine home directory".to_string()))
    }
}
