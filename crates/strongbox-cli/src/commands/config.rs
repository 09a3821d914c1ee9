use anyhow::Result;
use std::path::Path;

use strongbox_core::config::StrongboxConfig;

pub fn run(base_dir: &Path) -> Result<()> {
    let config_path = StrongboxConfig::default_path(base_dir);
    let config = StrongboxConfig::load(&config_path)?;

    println!("Config: {}", config_path.display());
    println!();
    println!("  Backend:        {:?}", config.storage.backend);
    println!("  DB path:        {}", config.storage.db_path);
    println!("  Key provider:   {}", config.keys.provider);
    println!("  Keyfile:        {}", config.keys.keyfile_path);
    println!(
        "  Encryption key: {}",
        if config.archive.encryption_key.is_some() { "configured" } else { "not set" }
    );
    println!("  Retention:      {} days", config.archive.retention_days);
    match config.archive.auto_backup_interval {
        Some(minutes) => println!("  Auto backup:    every {minutes} minute(s)"),
        None => println!("  Auto backup:    disabled"),
    }

    Ok(())
}
