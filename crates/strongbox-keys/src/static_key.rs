use async_trait::async_trait;
use strongbox_core::crypto::generate_key;
use strongbox_core::types::KeyMaterial;

use crate::provider::KeyProvider;

/// Holds one key in memory for the lifetime of the provider.
///
/// Built from a caller-supplied key, or from a freshly generated one that is
/// lost when the process exits unless the caller persists [`Self::key_hex`].
pub struct StaticKeyProvider {
    key: KeyMaterial,
    generated: bool,
}

impl StaticKeyProvider {
    pub fn new(key: KeyMaterial) -> Self {
        Self {
            key,
            generated: false,
        }
    }

    pub fn from_hex(encoded: &str) -> strongbox_core::Result<Self> {
        Ok(Self::new(KeyMaterial::from_hex(encoded)?))
    }

    pub fn generate() -> Self {
        let key = generate_key();
        tracing::warn!(
            fingerprint = %key.fingerprint(),
            "Generated an ephemeral encryption key; backups are unreadable after restart unless it is persisted"
        );
        Self {
            key,
            generated: true,
        }
    }

    /// True when the key was generated rather than supplied.
    pub fn is_ephemeral(&self) -> bool {
        self.generated
    }

    /// Export the key so it can be re-supplied to a later instance.
    pub fn key_hex(&self) -> String {
        self.key.to_hex()
    }
}

#[async_trait]
impl KeyProvider for StaticKeyProvider {
    async fn current_key(&self) -> anyhow::Result<KeyMaterial> {
        Ok(self.key.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}
