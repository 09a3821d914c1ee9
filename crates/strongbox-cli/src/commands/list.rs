use anyhow::Result;
use std::path::Path;

use super::format_bytes;

pub async fn run(base_dir: &Path, cli_passphrase: &Option<String>) -> Result<()> {
    let (_config, service) = super::open_service(base_dir, cli_passphrase)?;
    let backups = service.list_backups().await?;

    if backups.is_empty() {
        println!("No backups found.");
        return Ok(());
    }

    println!(
        "{:<38} {:<21} {:>10} {:<8} {}",
        "ID", "CREATED", "SIZE", "VERSION", "DESCRIPTION"
    );
    println!("{}", "-".repeat(100));

    for b in &backups {
        println!(
            "{:<38} {:<21} {:>10} {:<8} {}",
            b.id,
            b.timestamp.format("%Y-%m-%d %H:%M:%S"),
            format_bytes(b.size),
            b.version,
            b.description.as_deref().unwrap_or("-"),
        );
    }

    Ok(())
}
