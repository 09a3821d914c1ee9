use anyhow::Result;
use std::path::Path;

pub async fn run(
    backup_id: &str,
    out: Option<&Path>,
    base_dir: &Path,
    cli_passphrase: &Option<String>,
) -> Result<()> {
    let (_config, service) = super::open_service(base_dir, cli_passphrase)?;
    let exported = service.export_backup(backup_id).await?;

    match out {
        Some(path) => {
            std::fs::write(path, exported)?;
            eprintln!("Exported {backup_id} to {}", path.display());
        }
        None => println!("{exported}"),
    }
    Ok(())
}
