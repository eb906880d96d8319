use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use crate::models::job::{JobStatus, TrackingJob};
use crate::models::tracking::TrackingInfo;
use crate::services::queue::QueueEntry;
use crate::services::store::JobStore;
use crate::services::tracker::TrackerRegistry;

/// How a single processing attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Completed,
    Failed(String),
    /// The job expired before it was picked up.
    Expired,
    /// The job had already left `Pending`; nothing was done.
    Skipped(JobStatus),
}

/// Drives one job from `Pending` to a terminal state.
///
/// Every failure, including a panicking tracker, ends in a `Failed` store
/// write; nothing propagates to the caller.
#[derive(Clone)]
pub struct JobProcessor {
    store: Arc<JobStore>,
    trackers: Arc<TrackerRegistry>,
}

impl JobProcessor {
    pub fn new(store: Arc<JobStore>, trackers: Arc<TrackerRegistry>) -> Self {
        Self { store, trackers }
    }

    pub async fn process(&self, entry: QueueEntry) -> ProcessOutcome {
        let job_id = entry.job_id;

        let Some(job) = self.store.get(job_id).await else {
            tracing::warn!(%job_id, "Tracking job expired before processing");
            return ProcessOutcome::Expired;
        };

        if !self.store.transition_status(job_id, JobStatus::Processing).await {
            tracing::warn!(%job_id, status = %job.status, "Tracking job is not pending, skipping");
            return ProcessOutcome::Skipped(job.status);
        }

        let started = Instant::now();
        let outcome = match self.lookup(&job).await {
            Ok(result) => {
                self.store.complete(job_id, result).await;
                metrics::counter!("tracking_jobs_completed_total").increment(1);
                tracing::info!(
                    %job_id,
                    carrier = %job.input.carrier,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Tracking job completed"
                );
                ProcessOutcome::Completed
            }
            Err(message) => {
                self.store.fail(job_id, message.clone()).await;
                metrics::counter!("tracking_jobs_failed_total").increment(1);
                tracing::error!(
                    %job_id,
                    carrier = %job.input.carrier,
                    error = %message,
                    "Tracking job failed"
                );
                ProcessOutcome::Failed(message)
            }
        };

        metrics::histogram!("tracking_job_processing_seconds").record(started.elapsed().as_secs_f64());
        outcome
    }

    /// Resolve the carrier and run the lookup, flattening every failure into a message.
    async fn lookup(&self, job: &TrackingJob) -> Result<TrackingInfo, String> {
        let tracker = self
            .trackers
            .resolve(job.input.carrier)
            .map_err(|e| e.to_string())?;

        let lookup = tracker.track(&job.input.tracking_number);
        match AssertUnwindSafe(lookup).catch_unwind().await {
            Ok(Ok(info)) => Ok(info),
            Ok(Err(e)) => Err(e.to_string()),
            Err(panic) => Err(format!("Tracker panicked: {}", panic_message(panic.as_ref()))),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
