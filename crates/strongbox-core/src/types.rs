use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ArchiveError, Result};

/// Schema version written into every new backup's metadata.
pub const FORMAT_VERSION: &str = "1.0";

/// AES-GCM nonce length in bytes.
pub const IV_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Catalogue entry for one backup. Safe to hand to a UI: it carries no key
/// material and no ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Byte length of the stored ciphertext.
    pub size: u64,
    pub encrypted: bool,
    /// Reserved; no compression stage exists yet.
    pub compressed: bool,
    /// Hex SHA-256 of the serialized plaintext.
    pub checksum: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// AEAD output for one backup, owned by the store.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    pub iv: [u8; IV_LEN],
    pub auth_tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

impl fmt::Debug for EncryptedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedPayload")
            .field("iv", &hex::encode(self.iv))
            .field("ciphertext_len", &self.ciphertext.len())
            .finish()
    }
}

/// The two co-located records a store keeps per backup id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBackup {
    pub metadata: BackupMetadata,
    pub payload: EncryptedPayload,
}

/// Encryption key material, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    pub key: [u8; 32],
}

impl KeyMaterial {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let mut bytes = hex::decode(encoded.trim())
            .map_err(|e| ArchiveError::Validation(format!("Encryption key is not hex: {e}")))?;
        if bytes.len() != 32 {
            let len = bytes.len();
            bytes.zeroize();
            return Err(ArchiveError::Validation(format!(
                "Encryption key must be 32 bytes, got {len}"
            )));
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self { key })
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.key)
    }

    /// Short non-secret identifier for logs: first 8 bytes of SHA-256(key).
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let digest = Sha256::digest(self.key);
        hex::encode(&digest[..8])
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("fingerprint", &self.fingerprint())
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Aggregate view over the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupStats {
    pub total_backups: u64,
    pub total_size: u64,
    pub oldest_backup: Option<DateTime<Utc>>,
    pub newest_backup: Option<DateTime<Utc>>,
    pub average_size: f64,
}

impl BackupStats {
    /// Build stats from a newest-first metadata listing.
    pub fn from_listing(backups: &[BackupMetadata]) -> Self {
        let total_backups = backups.len() as u64;
        let total_size: u64 = backups.iter().map(|b| b.size).sum();
        let average_size = if total_backups == 0 {
            0.0
        } else {
            total_size as f64 / total_backups as f64
        };
        Self {
            total_backups,
            total_size,
            oldest_backup: backups.iter().map(|b| b.timestamp).min(),
            newest_backup: backups.iter().map(|b| b.timestamp).max(),
            average_size,
        }
    }
}

/// Sort metadata newest first; ties broken by id so the order is total.
pub fn sort_newest_first(backups: &mut [BackupMetadata]) {
    backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
}
