use anyhow::{Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

pub async fn run(
    backup_id: Option<&str>,
    all: bool,
    base_dir: &Path,
    cli_passphrase: &Option<String>,
) -> Result<()> {
    let (_config, service) = super::open_service(base_dir, cli_passphrase)?;

    let ids: Vec<String> = match (backup_id, all) {
        (Some(id), _) => vec![id.to_string()],
        (None, true) => service
            .list_backups()
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect(),
        (None, false) => bail!("pass a backup ID or --all"),
    };

    let pb = ProgressBar::new(ids.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let mut failed = Vec::new();
    for id in &ids {
        pb.set_message(id.clone());
        if !service.verify_backup(id).await {
            failed.push(id.clone());
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    println!("Verified: {}/{}", ids.len() - failed.len(), ids.len());
    for id in &failed {
        eprintln!("FAILED: {id}");
    }
    if !failed.is_empty() {
        bail!("{} backup(s) failed verification", failed.len());
    }

    Ok(())
}
