use anyhow::{Result, bail};
use std::path::Path;

pub async fn run(
    source: &Path,
    interval_minutes: Option<u64>,
    base_dir: &Path,
    cli_passphrase: &Option<String>,
) -> Result<()> {
    let (config, service) = super::open_service(base_dir, cli_passphrase)?;
    let Some(minutes) = interval_minutes.or(config.archive.auto_backup_interval) else {
        bail!("no interval: pass --interval-minutes or set archive.auto_backup_interval");
    };

    // Re-read on every run so each backup captures the file as it is then.
    let source = source.to_path_buf();
    let handle = service.schedule_auto_backup(
        move || {
            let text = std::fs::read_to_string(&source)?;
            Ok(serde_json::from_str::<serde_json::Value>(&text)?)
        },
        minutes,
    )?;

    println!("Backing up every {minutes} minute(s). Press Ctrl-C to stop.");
    tokio::signal::ctrl_c().await?;

    let stats = handle.shutdown().await;
    println!(
        "Stopped: {} backup(s) created, {} failed",
        stats.succeeded, stats.failed
    );
    Ok(())
}
