use anyhow::Result;
use std::path::Path;

use strongbox_archive::lifecycle::retention_cutoff;

use super::format_bytes;

pub async fn run(
    retention_days: Option<u32>,
    dry_run: bool,
    base_dir: &Path,
    cli_passphrase: &Option<String>,
) -> Result<()> {
    let (config, service) = super::open_service(base_dir, cli_passphrase)?;
    let days = retention_days.unwrap_or(config.archive.retention_days);

    if dry_run {
        let cutoff = retention_cutoff(chrono::Utc::now(), days);
        let expired: Vec<_> = service
            .list_backups()
            .await?
            .into_iter()
            .filter(|m| m.timestamp < cutoff)
            .collect();
        let bytes: u64 = expired.iter().map(|m| m.size).sum();
        println!(
            "Dry run: would delete {} backup(s) older than {days} days ({})",
            expired.len(),
            format_bytes(bytes)
        );
        for m in &expired {
            println!("  {} {}", m.id, m.timestamp.to_rfc3339());
        }
        return Ok(());
    }

    let deleted = service.cleanup_old_backups(days).await?;
    println!("Deleted {deleted} backup(s) older than {days} days");
    Ok(())
}
