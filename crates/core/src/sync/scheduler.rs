//! Background sync scheduling.
//!
//! Jobs are keyed: one fixed key for the periodic loop, one for the coalesced
//! one-off full sync, and one per record for incremental syncs. A key holds
//! at most one queued job at a time, which doubles as the mutual-exclusion
//! mechanism preventing duplicate concurrent work on the same record.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, error, warn};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::sync::engine::{backoff_seconds, classify_error, interval_with_jitter, SyncRetryClass};
use crate::sync::network_monitor::NetworkMonitor;
use crate::sync::sync_service::SyncService;

/// Unique key of the recurring full-sync job.
pub const PERIODIC_SYNC_KEY: &str = "sync_periodic";
/// Unique key of the coalesced one-off full-sync job.
pub const IMMEDIATE_SYNC_KEY: &str = "sync_immediate";

/// Recurring full-sync cadence.
pub const PERIODIC_SYNC_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);
/// Maximum jitter added to the periodic cadence.
pub const PERIODIC_SYNC_JITTER: Duration = Duration::from_secs(5 * 60);
/// Attempts per job run before the failure is reported upward.
pub const MAX_JOB_ATTEMPTS: u32 = 3;

/// Unique key of the one-off incremental job for a record.
pub fn single_record_key(car_id: &str) -> String {
    format!("sync_car_{car_id}")
}

struct ScheduledJob {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Schedules sync work as keyed tokio tasks, gated on connectivity.
pub struct SyncScheduler {
    service: Arc<SyncService>,
    network: Arc<NetworkMonitor>,
    jobs: Arc<Mutex<HashMap<String, ScheduledJob>>>,
    generations: AtomicU64,
}

fn lock_jobs(jobs: &Mutex<HashMap<String, ScheduledJob>>) -> MutexGuard<'_, HashMap<String, ScheduledJob>> {
    jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SyncScheduler {
    pub fn new(service: Arc<SyncService>, network: Arc<NetworkMonitor>) -> Self {
        Self {
            service,
            network,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            generations: AtomicU64::new(0),
        }
    }

    /// Idempotently register the recurring full-sync loop. An already-live
    /// loop is kept as-is.
    pub fn schedule_periodic(&self) {
        {
            let jobs = lock_jobs(&self.jobs);
            if let Some(job) = jobs.get(PERIODIC_SYNC_KEY) {
                if !job.handle.is_finished() {
                    debug!("Periodic sync already scheduled");
                    return;
                }
            }
        }

        let service = Arc::clone(&self.service);
        let network = Arc::clone(&self.network);
        let generation = self.next_generation();
        let handle = tokio::spawn(async move {
            loop {
                sleep(interval_with_jitter(
                    PERIODIC_SYNC_INTERVAL,
                    PERIODIC_SYNC_JITTER,
                ))
                .await;
                network.wait_until_online().await;
                run_full_sync(&service, &network, false).await;
            }
        });

        lock_jobs(&self.jobs).insert(
            PERIODIC_SYNC_KEY.to_string(),
            ScheduledJob { generation, handle },
        );
    }

    /// Enqueue a one-off full sync, replacing any already-queued one.
    pub fn schedule_immediate(&self, force: bool) {
        let service = Arc::clone(&self.service);
        let network = Arc::clone(&self.network);
        self.replace_job(IMMEDIATE_SYNC_KEY.to_string(), async move {
            network.wait_until_online().await;
            run_full_sync(&service, &network, force).await;
        });
    }

    /// Enqueue a one-off incremental sync for exactly one record.
    /// Re-triggering the same record replaces its queued job.
    pub fn schedule_single_record_sync(&self, car_id: &str) {
        let service = Arc::clone(&self.service);
        let network = Arc::clone(&self.network);
        let car_id = car_id.to_string();
        self.replace_job(single_record_key(&car_id), async move {
            network.wait_until_online().await;
            run_single_record_sync(&service, &car_id).await;
        });
    }

    /// Cancel all scheduled and queued sync work (sign-out path).
    pub fn cancel_all(&self) {
        let mut jobs = lock_jobs(&self.jobs);
        for (key, job) in jobs.drain() {
            debug!("Cancelling sync job '{key}'");
            job.handle.abort();
        }
    }

    /// Number of currently tracked jobs.
    pub fn scheduled_job_count(&self) -> usize {
        lock_jobs(&self.jobs).len()
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn replace_job<F>(&self, key: String, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.next_generation();
        let jobs = Arc::clone(&self.jobs);
        let cleanup_key = key.clone();
        let handle = tokio::spawn(async move {
            job.await;
            let mut jobs = lock_jobs(&jobs);
            // Only remove the entry if it still belongs to this run; a
            // replacement may have taken the key in the meantime.
            if jobs
                .get(&cleanup_key)
                .is_some_and(|job| job.generation == generation)
            {
                jobs.remove(&cleanup_key);
            }
        });

        let mut jobs = lock_jobs(&self.jobs);
        if let Some(previous) = jobs.insert(key, ScheduledJob { generation, handle }) {
            previous.handle.abort();
        }
    }
}

/// Run one full sync (plus the failure sweep) with bounded retry.
async fn run_full_sync(service: &SyncService, network: &NetworkMonitor, force: bool) {
    for attempt in 0..MAX_JOB_ATTEMPTS {
        match service.sync(force).await {
            Ok(report) => {
                if !report.skipped {
                    if let Err(err) = service.retry_failed_channels().await {
                        warn!("Failure sweep did not complete: {err}");
                    }
                }
                return;
            }
            Err(err) => {
                let retryable = classify_error(&err) == SyncRetryClass::Retryable;
                if retryable && attempt + 1 < MAX_JOB_ATTEMPTS {
                    let delay = backoff_seconds(attempt as i32);
                    warn!(
                        "Full sync attempt {} failed: {err}; retrying in {delay}s",
                        attempt + 1
                    );
                    sleep(Duration::from_secs(delay as u64)).await;
                } else {
                    error!("Full sync failed after attempt {}: {err}", attempt + 1);
                    network.report_sync_error(err.to_string());
                    return;
                }
            }
        }
    }
}

/// Run one incremental sync with bounded retry. Channel-level failures are
/// recorded on the record itself; only store errors reach this loop.
async fn run_single_record_sync(service: &SyncService, car_id: &str) {
    for attempt in 0..MAX_JOB_ATTEMPTS {
        match service.sync_incremental(car_id).await {
            Ok(()) => return,
            Err(err) => {
                let retryable = classify_error(&err) == SyncRetryClass::Retryable;
                if retryable && attempt + 1 < MAX_JOB_ATTEMPTS {
                    let delay = backoff_seconds(attempt as i32);
                    warn!(
                        "Incremental sync attempt {} for {car_id} failed: {err}; retrying in {delay}s",
                        attempt + 1
                    );
                    sleep(Duration::from_secs(delay as u64)).await;
                } else {
                    error!("Incremental sync for {car_id} failed after attempt {}: {err}", attempt + 1);
                    return;
                }
            }
        }
    }
}
