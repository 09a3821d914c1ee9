use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use strongbox_core::Result;
use strongbox_core::types::BackupMetadata;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Outcome counters for one auto-backup schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoBackupStats {
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Default)]
struct RunCounters {
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl RunCounters {
    fn snapshot(&self) -> AutoBackupStats {
        AutoBackupStats {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Handle to a running auto-backup schedule.
///
/// Dropping the handle does not stop the schedule; call [`Self::cancel`] or
/// [`Self::shutdown`].
pub struct AutoBackupHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    counters: Arc<RunCounters>,
}

impl AutoBackupHandle {
    /// Stop firing new runs. A run already in progress completes.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn stats(&self) -> AutoBackupStats {
        self.counters.snapshot()
    }

    /// Cancel and wait for the schedule task to exit.
    pub async fn shutdown(self) -> AutoBackupStats {
        let Self {
            cancel,
            task,
            counters,
        } = self;
        cancel.cancel();
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Auto-backup task ended abnormally");
        }
        counters.snapshot()
    }
}

/// Run `job` every `period`, first run one period from now.
///
/// Each run is awaited inside the loop, so runs of one schedule never
/// overlap; ticks missed while a run is still going are skipped. Failures
/// are logged and counted, and the next tick still fires.
pub(crate) fn spawn_schedule<F, Fut>(period: Duration, mut job: F) -> AutoBackupHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<BackupMetadata>> + Send + 'static,
{
    let cancel = CancellationToken::new();
    let counters = Arc::new(RunCounters::default());

    let task = {
        let cancel = cancel.clone();
        let counters = counters.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(period_secs = period.as_secs(), "Auto-backup schedule started");
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        match job().await {
                            Ok(meta) => {
                                counters.succeeded.fetch_add(1, Ordering::Relaxed);
                                tracing::info!(backup_id = %meta.id, "Auto backup completed");
                            }
                            Err(e) => {
                                counters.failed.fetch_add(1, Ordering::Relaxed);
                                tracing::error!(error = %e, kind = %e.kind(), "Auto backup failed");
                            }
                        }
                    }
                }
            }
            tracing::info!("Auto-backup schedule stopped");
        })
    };

    AutoBackupHandle {
        cancel,
        task,
        counters,
    }
}
