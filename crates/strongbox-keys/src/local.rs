use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::Argon2;
use async_trait::async_trait;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strongbox_core::crypto::generate_key;
use strongbox_core::types::KeyMaterial;
use zeroize::Zeroize;

use crate::provider::KeyProvider;

/// Passphrase-protected keyfile provider.
///
/// The archive key is wrapped with AES-256-GCM under a master key derived
/// from the passphrase with Argon2id, so the same key is available across
/// restarts.
///
/// File layout: salt (32) + nonce (12) + ciphertext(json KeyStore)
pub struct LocalKeyProvider {
    keyfile_path: PathBuf,
    keystore: KeyStore,
}

#[derive(Serialize, Deserialize)]
struct KeyStore {
    /// Version for forward compatibility.
    version: u32,
    /// Argon2id salt.
    salt: [u8; 32],
    /// The 32-byte archive key.
    key: [u8; 32],
    created_at: String,
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("version", &self.version)
            .field("key", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

const KEYSTORE_VERSION: u32 = 1;
const HEADER_LEN: usize = 32 + 12;

impl LocalKeyProvider {
    /// Derive a master key from passphrase using Argon2id.
    fn derive_master_key(passphrase: &[u8], salt: &[u8; 32]) -> anyhow::Result<[u8; 32]> {
        let mut key = [0u8; 32];
        Argon2::default()
            .hash_password_into(passphrase, salt, &mut key)
            .map_err(|e| anyhow::anyhow!("Argon2id key derivation failed: {e}"))?;
        Ok(key)
    }

    fn encrypt_keystore(keystore: &KeyStore, passphrase: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut master_key = Self::derive_master_key(passphrase, &keystore.salt)?;
        let mut plaintext = serde_json::to_vec(keystore)?;
        let cipher = Aes256Gcm::new_from_slice(&master_key)
            .map_err(|e| anyhow::anyhow!("Invalid master key: {e}"))?;
        master_key.zeroize();

        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_ref())
            .map_err(|e| anyhow::anyhow!("Keystore encryption failed: {e}"))?;
        plaintext.zeroize();

        let mut output = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        output.extend_from_slice(&keystore.salt);
        output.extend_from_slice(&nonce_bytes);
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    fn decrypt_keystore(data: &[u8], passphrase: &[u8]) -> anyhow::Result<KeyStore> {
        if data.len() < HEADER_LEN {
            anyhow::bail!("Keyfile too short");
        }

        let salt: [u8; 32] = data[..32].try_into()?;
        let nonce_bytes: [u8; 12] = data[32..HEADER_LEN].try_into()?;
        let ciphertext = &data[HEADER_LEN..];

        let mut master_key = Self::derive_master_key(passphrase, &salt)?;
        let cipher = Aes256Gcm::new_from_slice(&master_key)
            .map_err(|e| anyhow::anyhow!("Invalid master key: {e}"))?;
        master_key.zeroize();

        let nonce = Nonce::from_slice(&nonce_bytes);
        let mut plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| anyhow::anyhow!("Wrong passphrase or corrupted keyfile"))?;

        let keystore: KeyStore = serde_json::from_slice(&plaintext)?;
        plaintext.zeroize();
        if keystore.version != KEYSTORE_VERSION {
            anyhow::bail!("Unsupported keyfile version {}", keystore.version);
        }
        Ok(keystore)
    }

    fn save(&self, passphrase: &[u8]) -> anyhow::Result<()> {
        let data = Self::encrypt_keystore(&self.keystore, passphrase)?;
        if let Some(parent) = self.keyfile_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.keyfile_path, data)?;
        Ok(())
    }

    /// Create a keyfile holding a freshly generated key.
    pub fn create(keyfile_path: &Path, passphrase: &[u8]) -> anyhow::Result<Self> {
        Self::create_with_key(keyfile_path, passphrase, generate_key())
    }

    /// Create a keyfile wrapping a caller-supplied key.
    pub fn create_with_key(
        keyfile_path: &Path,
        passphrase: &[u8],
        key: KeyMaterial,
    ) -> anyhow::Result<Self> {
        if keyfile_path.exists() {
            anyhow::bail!("Keyfile already exists: {}", keyfile_path.display());
        }
        let mut salt = [0u8; 32];
        OsRng.fill_bytes(&mut salt);

        let provider = Self {
            keyfile_path: keyfile_path.to_path_buf(),
            keystore: KeyStore {
                version: KEYSTORE_VERSION,
                salt,
                key: key.key,
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        };
        provider.save(passphrase)?;
        tracing::info!(
            path = %keyfile_path.display(),
            fingerprint = %key.fingerprint(),
            "Created keyfile"
        );
        Ok(provider)
    }

    /// Open an existing keyfile.
    pub fn open(keyfile_path: &Path, passphrase: &[u8]) -> anyhow::Result<Self> {
        let data = std::fs::read(keyfile_path)?;
        let keystore = Self::decrypt_keystore(&data, passphrase)?;

        Ok(Self {
            keyfile_path: keyfile_path.to_path_buf(),
            keystore,
        })
    }

    pub fn created_at(&self) -> &str {
        &self.keystore.created_at
    }
}

impl Drop for LocalKeyProvider {
    fn drop(&mut self) {
        self.keystore.key.zeroize();
    }
}

#[async_trait]
impl KeyProvider for LocalKeyProvider {
    async fn current_key(&self) -> anyhow::Result<KeyMaterial> {
        Ok(KeyMaterial::new(self.keystore.key))
    }

    fn name(&self) -> &str {
        "local"
    }
}
