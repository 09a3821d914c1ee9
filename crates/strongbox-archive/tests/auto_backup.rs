//! Scheduled auto-backups under paused tokio time.

use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use strongbox_archive::{ArchiveError, AutoBackupStats, BackupArchiveService};
use strongbox_core::config::ArchiveSettings;

fn service(interval: Option<u64>) -> BackupArchiveService {
    BackupArchiveService::new(ArchiveSettings {
        encryption_key: Some("ab".repeat(32)),
        retention_days: 30,
        auto_backup_interval: interval,
    })
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn creates_one_backup_per_interval() {
    let service = service(None);
    let counter = Arc::new(AtomicU32::new(0));
    let handle = {
        let counter = counter.clone();
        service
            .schedule_auto_backup(
                move || Ok(json!({"tick": counter.fetch_add(1, Ordering::SeqCst)})),
                1,
            )
            .unwrap()
    };

    tokio::time::sleep(Duration::from_secs(3 * 60 + 1)).await;
    let stats = handle.shutdown().await;
    assert_eq!(stats, AutoBackupStats { succeeded: 3, failed: 0 });

    let listing = service.list_backups().await.unwrap();
    assert_eq!(listing.len(), 3);
    for meta in &listing {
        let description = meta.description.as_deref().unwrap();
        assert!(description.starts_with("Auto backup at "), "{description}");
        assert!(service.verify_backup(&meta.id).await);
    }
}

#[tokio::test(start_paused = true)]
async fn provider_failure_is_reported_and_schedule_continues() {
    let service = service(None);
    let calls = Arc::new(AtomicU32::new(0));
    let handle = {
        let calls = calls.clone();
        service
            .schedule_auto_backup(
                move || {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        anyhow::bail!("snapshot source unavailable");
                    }
                    Ok(json!({"ok": true}))
                },
                2,
            )
            .unwrap()
    };

    tokio::time::sleep(Duration::from_secs(3 * 2 * 60 + 1)).await;
    let stats = handle.shutdown().await;
    assert_eq!(stats, AutoBackupStats { succeeded: 2, failed: 1 });
    assert_eq!(service.list_backups().await.unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancelled_schedule_creates_nothing_more() {
    let service = service(None);
    let handle = service
        .schedule_auto_backup(|| Ok(json!("snapshot")), 1)
        .unwrap();

    tokio::time::sleep(Duration::from_secs(61)).await;
    handle.cancel();
    tokio::time::sleep(Duration::from_secs(10 * 60)).await;
    let stats = handle.shutdown().await;

    assert_eq!(stats.succeeded, 1);
    assert_eq!(service.list_backups().await.unwrap().len(), 1);
}

#[tokio::test]
async fn zero_interval_rejected() {
    let service = service(None);
    let result = service.schedule_auto_backup(|| Ok(json!(1)), 0);
    assert!(matches!(result, Err(ArchiveError::Validation(_))));
}

#[tokio::test]
async fn unrepresentable_interval_rejected() {
    let service = service(None);
    for minutes in [u64::MAX / 30, u64::MAX] {
        let result = service.schedule_auto_backup(|| Ok(json!(1)), minutes);
        assert!(matches!(result, Err(ArchiveError::Validation(_))));
    }
    let result = service.schedule_auto_backup_every(|| Ok(json!(1)), Duration::MAX);
    assert!(matches!(result, Err(ArchiveError::Validation(_))));
    assert!(service.list_backups().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn configured_interval_starts_schedule() {
    let unscheduled = service(None);
    assert!(
        unscheduled
            .start_configured_auto_backup(|| Ok(json!(1)))
            .unwrap()
            .is_none()
    );

    let scheduled = service(Some(5));
    let handle = scheduled
        .start_configured_auto_backup(|| Ok(json!({"from": "config"})))
        .unwrap()
        .expect("interval configured");

    tokio::time::sleep(Duration::from_secs(5 * 60 + 1)).await;
    assert_eq!(handle.shutdown().await.succeeded, 1);
}
