//! In-memory job store with sliding and absolute expiry.
//!
//! Every write pushes the record's sliding deadline out by one window; the
//! absolute deadline is fixed when the record is first stored, so a job that
//! keeps being touched still disappears eventually. Expired records are hidden
//! from readers immediately and physically removed by the next write, read or
//! sweep that encounters them.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::job::{JobStatus, TrackingJob};
use crate::models::tracking::TrackingInfo;

/// The absolute ceiling is this many sliding windows after first store.
pub const ABSOLUTE_EXPIRATION_FACTOR: u32 = 2;

struct Entry {
    job: TrackingJob,
    sliding_deadline: Instant,
    absolute_deadline: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.sliding_deadline || now >= self.absolute_deadline
    }
}

/// Keyed, TTL-expiring holder of job records.
pub struct JobStore {
    entries: RwLock<HashMap<Uuid, Entry>>,
    sliding: Duration,
    absolute: Duration,
}

impl JobStore {
    pub fn new(sliding: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            sliding,
            absolute: sliding * ABSOLUTE_EXPIRATION_FACTOR,
        }
    }

    pub fn sliding_expiration(&self) -> Duration {
        self.sliding
    }

    /// Store a job, replacing any record with the same id and restarting both windows.
    pub async fn put(&self, job: TrackingJob) {
        let now = Instant::now();
        let entry = Entry {
            job,
            sliding_deadline: now + self.sliding,
            absolute_deadline: now + self.absolute,
        };
        self.entries.write().await.insert(entry.job.id, entry);
    }

    /// Fetch a live job. Reads do not extend the record's lifetime.
    pub async fn get(&self, id: Uuid) -> Option<TrackingJob> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(&id) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(entry.job.clone()),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(&id).is_some_and(|e| e.is_expired(now)) {
            entries.remove(&id);
        }
        None
    }

    /// Move a job to `status`. Returns `false` (and changes nothing) when the
    /// job is unknown, expired, or the move would go backwards.
    pub async fn transition_status(&self, id: Uuid, status: JobStatus) -> bool {
        self.update(id, |job| {
            if !job.status.can_transition_to(status) {
                return false;
            }
            job.status = status;
            true
        })
        .await
    }

    /// Record a successful lookup. The first terminal write wins.
    pub async fn complete(&self, id: Uuid, result: TrackingInfo) -> bool {
        self.update(id, |job| {
            if job.status.is_terminal() {
                return false;
            }
            job.status = JobStatus::Completed;
            job.result = Some(result);
            job.completed_at = Some(Utc::now());
            true
        })
        .await
    }

    /// Record a failed lookup. The first terminal write wins.
    pub async fn fail(&self, id: Uuid, error: impl Into<String>) -> bool {
        let error = error.into();
        self.update(id, |job| {
            if job.status.is_terminal() {
                return false;
            }
            job.status = JobStatus::Failed;
            job.error = Some(error);
            job.completed_at = Some(Utc::now());
            true
        })
        .await
    }

    /// Apply `mutate` to a live record and refresh its sliding window if it reports a change.
    async fn update<F>(&self, id: Uuid, mutate: F) -> bool
    where
        F: FnOnce(&mut TrackingJob) -> bool,
    {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let Some(entry) = entries.get_mut(&id) else {
            return false;
        };
        if entry.is_expired(now) {
            entries.remove(&id);
            return false;
        }

        let changed = mutate(&mut entry.job);
        if changed {
            entry.sliding_deadline = now + self.sliding;
        }
        changed
    }

    /// Number of records held, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Remove every expired record. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Periodically purge expired records until `shutdown` fires.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let period = (self.sliding / 2).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        let removed = self.purge_expired().await;
                        if removed > 0 {
                            tracing::debug!(removed, "Purged expired tracking jobs");
                        }
                    }
                }
            }
        })
    }
}
