use anyhow::{Context, Result};
use std::path::Path;

use super::format_bytes;

pub async fn run(
    source: &Path,
    description: Option<&str>,
    base_dir: &Path,
    cli_passphrase: &Option<String>,
) -> Result<()> {
    let text = std::fs::read_to_string(source)
        .with_context(|| format!("reading {}", source.display()))?;
    let snapshot: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("{} is not JSON", source.display()))?;

    let (_config, service) = super::open_service(base_dir, cli_passphrase)?;
    let metadata = service.create_backup(&snapshot, description).await?;

    println!("Backup completed:");
    println!("  ID:        {}", metadata.id);
    println!("  Created:   {}", metadata.timestamp.to_rfc3339());
    println!("  Size:      {}", format_bytes(metadata.size));
    println!("  Checksum:  {}", metadata.checksum);

    Ok(())
}
