use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::{ArchiveError, Result};
use crate::types::{EncryptedPayload, IV_LEN, KeyMaterial, TAG_LEN};

/// Generate a fresh 256-bit key from the OS CSPRNG.
pub fn generate_key() -> KeyMaterial {
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    KeyMaterial::new(key)
}

/// Encrypt a snapshot with AES-256-GCM.
///
/// - IV: 12 random bytes from OsRng, fresh per call
/// - AAD: caller-chosen binding (the backup id), so a payload cannot be
///   replayed under a different id
pub fn encrypt_payload(plaintext: &[u8], key: &KeyMaterial, aad: &[u8]) -> Result<EncryptedPayload> {
    let cipher = Aes256Gcm::new_from_slice(&key.key)
        .map_err(|e| ArchiveError::Encryption(format!("Invalid key: {e}")))?;

    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    let nonce = Nonce::from_slice(&iv);

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(nonce, aad, &mut buffer)
        .map_err(|e| ArchiveError::Encryption(format!("Encryption failed: {e}")))?;

    let mut auth_tag = [0u8; TAG_LEN];
    auth_tag.copy_from_slice(tag.as_slice());

    Ok(EncryptedPayload {
        iv,
        auth_tag,
        ciphertext: buffer,
    })
}

/// Decrypt and authenticate a payload. A rejected tag means the ciphertext,
/// tag, IV or AAD was altered, or the key is wrong.
pub fn decrypt_payload(payload: &EncryptedPayload, key: &KeyMaterial, aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(&key.key)
        .map_err(|e| ArchiveError::Encryption(format!("Invalid key: {e}")))?;

    let nonce = Nonce::from_slice(&payload.iv);
    let tag = Tag::from_slice(&payload.auth_tag);

    let mut buffer = payload.ciphertext.clone();
    cipher
        .decrypt_in_place_detached(nonce, aad, &mut buffer, tag)
        .map_err(|_| {
            ArchiveError::Integrity("authentication tag rejected (corrupted, tampered, or wrong key)".into())
        })?;
    Ok(buffer)
}
