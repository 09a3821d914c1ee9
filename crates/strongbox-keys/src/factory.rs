//! Factory for creating the appropriate KeyProvider based on configuration.

use std::path::Path;

use crate::local::LocalKeyProvider;
use crate::provider::KeyProvider;
use crate::static_key::StaticKeyProvider;

/// Create a KeyProvider based on the provider type string from config.
///
/// Supported types:
/// - `"static"`: the configured hex key, or an ephemeral generated key when none is set
/// - `"local"`: passphrase-protected keyfile; created on first use, seeded
///   with `encryption_key` if one is configured
pub fn create_key_provider(
    provider_type: &str,
    encryption_key: Option<&str>,
    passphrase: Option<&[u8]>,
    keyfile_path: &str,
) -> anyhow::Result<Box<dyn KeyProvider>> {
    match provider_type {
        "static" => {
            let provider = match encryption_key {
                Some(hex) => StaticKeyProvider::from_hex(hex)?,
                None => StaticKeyProvider::generate(),
            };
            Ok(Box::new(provider))
        }

        "local" => {
            let passphrase = passphrase
                .ok_or_else(|| anyhow::anyhow!("Passphrase required for local key provider"))?;
            let path = Path::new(keyfile_path);
            let provider = if path.exists() {
                LocalKeyProvider::open(path, passphrase)?
            } else {
                match encryption_key {
                    Some(hex) => LocalKeyProvider::create_with_key(
                        path,
                        passphrase,
                        strongbox_core::types::KeyMaterial::from_hex(hex)?,
                    )?,
                    None => LocalKeyProvider::create(path, passphrase)?,
                }
            };
            Ok(Box::new(provider))
        }

        other => anyhow::bail!("Unknown key provider type: {other}"),
    }
}
