pub mod backup;
pub mod cleanup;
pub mod config;
pub mod delete;
pub mod export;
pub mod import;
pub mod init;
pub mod list;
pub mod restore;
pub mod schedule;
pub mod stats;
pub mod verify;

use anyhow::Result;
use std::path::Path;

use strongbox_archive::BackupArchiveService;
use strongbox_core::config::StrongboxConfig;

/// Load `<base_dir>/strongbox.toml` and build the archive service from it.
/// Prompts for a passphrase only when the keyfile provider needs one.
pub fn open_service(
    base_dir: &Path,
    cli_passphrase: &Option<String>,
) -> Result<(StrongboxConfig, BackupArchiveService)> {
    let config_path = StrongboxConfig::default_path(base_dir);
    let config = StrongboxConfig::load(&config_path)?;

    let passphrase = if config.keys.provider == "local" {
        Some(crate::get_passphrase(cli_passphrase)?)
    } else {
        None
    };
    if config.keys.provider == "static" && config.archive.encryption_key.is_none() {
        eprintln!("warning: no encryption_key configured; backups from this run cannot be restored later");
    }

    let service =
        BackupArchiveService::from_config(&config, passphrase.as_deref().map(str::as_bytes))?;
    Ok((config, service))
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
