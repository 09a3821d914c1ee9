use async_trait::async_trait;
use strongbox_core::types::KeyMaterial;

/// Trait for key management backends.
///
/// An archive instance encrypts and decrypts everything with the provider's
/// current key; where that key lives and how it is rotated is up to the
/// implementation.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    /// Get the active encryption key.
    async fn current_key(&self) -> anyhow::Result<KeyMaterial>;

    /// Provider name for display.
    fn name(&self) -> &str;
}
