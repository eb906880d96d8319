use std::sync::Arc;

use crate::config::AppConfig;
use crate::middleware::RequestLimiter;
use crate::models::job::{Carrier, TrackingJob};
use crate::services::{
    queue::{Admission, JobQueue, QueueEntry},
    store::JobStore,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JobStore>,
    pub queue: Arc<JobQueue>,
    pub config: Arc<AppConfig>,
    pub limiter: Arc<RequestLimiter>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let store = JobStore::new(config.cache_expiration());
        let queue = JobQueue::new(config.channel_capacity);
        let limiter = RequestLimiter::from_config(&config);
        Self {
            store: Arc::new(store),
            queue: Arc::new(queue),
            config: Arc::new(config),
            limiter: Arc::new(limiter),
        }
    }

    /// Record a new `Pending` job and hand it to the dispatcher.
    pub async fn submit(&self, tracking_number: String, carrier: Carrier) -> TrackingJob {
        let job = TrackingJob::new(tracking_number, carrier);
        self.store.put(job.clone()).await;

        if self.queue.enqueue(QueueEntry::from(job.id)) == Admission::Closed {
            tracing::warn!(job_id = %job.id, "Job queue closed, job will not be processed");
        }
        metrics::counter!("tracking_jobs_submitted_total").increment(1);
        tracing::info!(
            job_id = %job.id,
            tracking_number = %job.input.tracking_number,
            carrier = %job.input.carrier,
            "Tracking job submitted"
        );

        job
    }
}
