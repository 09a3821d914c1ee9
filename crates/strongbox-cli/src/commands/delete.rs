use anyhow::{Result, bail};
use std::path::Path;

pub async fn run(backup_id: &str, base_dir: &Path, cli_passphrase: &Option<String>) -> Result<()> {
    let (_config, service) = super::open_service(base_dir, cli_passphrase)?;

    if !service.delete_backup(backup_id).await {
        bail!("backup {backup_id} not found");
    }
    println!("Deleted {backup_id}");
    Ok(())
}
