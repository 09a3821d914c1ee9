use anyhow::Result;
use std::path::Path;

use strongbox_archive::BackupArchiveService;
use strongbox_core::config::StrongboxConfig;

pub fn run(base_dir: &Path, cli_passphrase: &Option<String>) -> Result<()> {
    println!("Initializing Strongbox in {}", base_dir.display());

    std::fs::create_dir_all(base_dir)?;

    let config_path = StrongboxConfig::default_path(base_dir);
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
    } else {
        let config = StrongboxConfig::default_config(base_dir);
        config.save(&config_path)?;
        println!("Created config: {}", config_path.display());
    }

    let config = StrongboxConfig::load(&config_path)?;

    // Building the service creates the database and, for the local
    // provider, the keyfile.
    let keyfile = Path::new(&config.keys.keyfile_path);
    let keyfile_existed = keyfile.exists();
    let passphrase = if config.keys.provider == "local" {
        Some(crate::get_passphrase(cli_passphrase)?)
    } else {
        None
    };
    BackupArchiveService::from_config(&config, passphrase.as_deref().map(str::as_bytes))?;

    println!("Initialized {:?} store: {}", config.storage.backend, config.storage.db_path);
    match config.keys.provider.as_str() {
        "local" if keyfile_existed => println!("Keyfile already exists: {}", keyfile.display()),
        "local" => println!("Created keyfile: {}", keyfile.display()),
        other => println!("Key provider '{other}' uses archive.encryption_key from the config."),
    }

    println!("\nStrongbox initialized. Next steps:");
    println!("  1. Review {}", config_path.display());
    println!("  2. Run `strongbox backup <file.json>` to create your first backup");

    Ok(())
}
