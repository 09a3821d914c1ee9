use anyhow::Result;
use std::path::Path;

use super::format_bytes;

pub async fn run(base_dir: &Path, cli_passphrase: &Option<String>) -> Result<()> {
    let (config, service) = super::open_service(base_dir, cli_passphrase)?;
    let stats = service.backup_stats().await?;

    println!("Strongbox Status");
    println!("================");
    println!();
    println!("  Store:          {:?} ({})", config.storage.backend, config.storage.db_path);
    println!("  Key provider:   {}", config.keys.provider);
    println!("  Retention:      {} days", config.archive.retention_days);
    println!();
    println!("  Backups:        {}", stats.total_backups);
    println!("  Total size:     {}", format_bytes(stats.total_size));
    println!("  Average size:   {}", format_bytes(stats.average_size.round() as u64));
    if let (Some(oldest), Some(newest)) = (stats.oldest_backup, stats.newest_backup) {
        println!("  Oldest:         {}", oldest.to_rfc3339());
        println!("  Newest:         {}", newest.to_rfc3339());
    }

    Ok(())
}
