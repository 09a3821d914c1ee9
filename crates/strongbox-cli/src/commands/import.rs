use anyhow::{Context, Result};
use std::path::Path;

pub async fn run(path: &Path, base_dir: &Path, cli_passphrase: &Option<String>) -> Result<()> {
    let exported =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;

    let (_config, service) = super::open_service(base_dir, cli_passphrase)?;
    let metadata = service.import_backup(&exported).await?;

    println!("Imported {} (created {})", metadata.id, metadata.timestamp.to_rfc3339());
    Ok(())
}
