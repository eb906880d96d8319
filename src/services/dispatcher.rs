use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::services::processor::JobProcessor;
use crate::services::queue::JobQueue;

/// Background loop that drains the job queue with bounded parallelism.
pub struct Dispatcher {
    queue: Arc<JobQueue>,
    processor: JobProcessor,
    max_concurrent: usize,
    processing_delay: Duration,
}

impl Dispatcher {
    pub fn new(queue: Arc<JobQueue>, processor: JobProcessor, max_concurrent: usize) -> Self {
        Self {
            queue,
            processor,
            max_concurrent: max_concurrent.max(1),
            processing_delay: Duration::ZERO,
        }
    }

    pub fn from_config(queue: Arc<JobQueue>, processor: JobProcessor, config: &AppConfig) -> Self {
        Self::new(queue, processor, config.max_concurrent_processing)
            .with_processing_delay(config.processing_delay())
    }

    /// Pause before each lookup to smooth bursts against the carrier.
    pub fn with_processing_delay(mut self, delay: Duration) -> Self {
        self.processing_delay = delay;
        self
    }

    pub fn spawn(self, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Run until `shutdown` fires or the queue is closed and drained, then
    /// wait for every in-flight job to finish.
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            max_concurrent = self.max_concurrent,
            delay_ms = self.processing_delay.as_millis() as u64,
            "Tracking dispatcher started"
        );

        let permits = Arc::new(Semaphore::new(self.max_concurrent));
        let mut in_flight = JoinSet::new();

        loop {
            // Take a slot before dequeuing; waiting entries stay in the queue.
            let permit = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                permit = permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let entry = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                entry = self.queue.dequeue() => match entry {
                    Some(entry) => entry,
                    None => break,
                },
            };

            while let Some(finished) = in_flight.try_join_next() {
                log_join_result(finished);
            }

            let processor = self.processor.clone();
            let delay = self.processing_delay;
            in_flight.spawn(async move {
                let _permit = permit;
                let _gauge = InFlightGauge::enter();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                processor.process(entry).await;
            });
        }

        tracing::info!(
            in_flight = in_flight.len(),
            "Tracking dispatcher stopping, waiting for in-flight jobs"
        );
        while let Some(finished) = in_flight.join_next().await {
            log_join_result(finished);
        }
        tracing::info!("Tracking dispatcher stopped");
    }
}

/// Counts a task in `tracking_jobs_in_flight` for as long as it is alive.
struct InFlightGauge;

impl InFlightGauge {
    fn enter() -> Self {
        metrics::gauge!("tracking_jobs_in_flight").increment(1.0);
        Self
    }
}

impl Drop for InFlightGauge {
    fn drop(&mut self) {
        metrics::gauge!("tracking_jobs_in_flight").decrement(1.0);
    }
}

fn log_join_result(result: Result<(), JoinError>) {
    if let Err(e) = result {
        tracing::error!(error = %e, "Tracking job task aborted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::{Carrier, JobStatus, TrackingJob};
    use crate::models::tracking::{TrackingInfo, TrackingStatus};
    use crate::services::queue::QueueEntry;
    use crate::services::store::JobStore;
    use crate::services::tracker::{TrackError, Tracker, TrackerRegistry};
    use async_trait::async_trait;
    use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SlowTracker {
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Tracker for SlowTracker {
        fn carrier(&self) -> Carrier {
            Carrier::Ups
        }

        async fn track(&self, tracking_number: &str) -> Result<TrackingInfo, TrackError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(TrackingInfo::normalize(
                tracking_number,
                Carrier::Ups,
                TrackingStatus::InTransit,
                Vec::new(),
            ))
        }
    }

    struct Harness {
        store: Arc<JobStore>,
        queue: Arc<JobQueue>,
        tracker: Arc<SlowTracker>,
        processor: JobProcessor,
    }

    fn harness(lookup_delay: Duration) -> Harness {
        let store = Arc::new(JobStore::new(Duration::from_secs(300)));
        let queue = Arc::new(JobQueue::new(100));
        let tracker = Arc::new(SlowTracker {
            delay: lookup_delay,
            calls: AtomicUsize::new(0),
        });
        let registry = TrackerRegistry::new().with(tracker.clone());
        let processor = JobProcessor::new(store.clone(), Arc::new(registry));
        Harness {
            store,
            queue,
            tracker,
            processor,
        }
    }

    async fn submit(h: &Harness) -> uuid::Uuid {
        let job = TrackingJob::new("1Z999AA10123456784", Carrier::Ups);
        let id = job.id;
        h.store.put(job).await;
        h.queue.enqueue(QueueEntry::from(id));
        id
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_queue_is_drained_then_loop_exits() {
        let h = harness(Duration::from_millis(50));
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(submit(&h).await);
        }
        h.queue.close();

        Dispatcher::new(h.queue.clone(), h.processor.clone(), 2)
            .run(CancellationToken::new())
            .await;

        for id in ids {
            assert_eq!(h.store.get(id).await.unwrap().status, JobStatus::Completed);
        }
        assert_eq!(h.tracker.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_in_flight_jobs() {
        let h = harness(Duration::from_secs(10));
        let id = submit(&h).await;
        let shutdown = CancellationToken::new();
        let handle = Dispatcher::new(h.queue.clone(), h.processor.clone(), 4).spawn(shutdown.clone());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.store.get(id).await.unwrap().status, JobStatus::Processing);

        shutdown.cancel();
        handle.await.unwrap();
        assert_eq!(h.store.get(id).await.unwrap().status, JobStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_leaves_queued_jobs_untouched() {
        let h = harness(Duration::from_secs(10));
        let first = submit(&h).await;
        let second = submit(&h).await;
        let shutdown = CancellationToken::new();
        let handle = Dispatcher::new(h.queue.clone(), h.processor.clone(), 1).spawn(shutdown.clone());

        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(h.store.get(first).await.unwrap().status, JobStatus::Completed);
        assert_eq!(h.store.get(second).await.unwrap().status, JobStatus::Pending);
        assert_eq!(h.queue.depth(), 1);
    }

    fn in_flight_gauge(handle: &PrometheusHandle) -> Option<f64> {
        handle
            .render()
            .lines()
            .find_map(|line| line.strip_prefix("tracking_jobs_in_flight "))
            .and_then(|value| value.trim().parse().ok())
    }

    #[test]
    fn test_in_flight_gauge_tracks_running_jobs() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()
            .unwrap();

        metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                let h = harness(Duration::from_secs(1));
                let first = submit(&h).await;
                let second = submit(&h).await;
                let shutdown = CancellationToken::new();
                let dispatcher =
                    Dispatcher::new(h.queue.clone(), h.processor.clone(), 4).spawn(shutdown.clone());

                tokio::time::sleep(Duration::from_millis(500)).await;
                assert_eq!(in_flight_gauge(&handle), Some(2.0));

                // Both finish while the dispatcher sits idle on an empty queue.
                tokio::time::sleep(Duration::from_secs(2)).await;
                assert_eq!(h.store.get(first).await.unwrap().status, JobStatus::Completed);
                assert_eq!(h.store.get(second).await.unwrap().status, JobStatus::Completed);
                assert_eq!(in_flight_gauge(&handle), Some(0.0));

                shutdown.cancel();
                dispatcher.await.unwrap();
            })
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_processing_delay_keeps_job_pending() {
        let h = harness(Duration::ZERO);
        let id = submit(&h).await;
        h.queue.close();
        let handle = Dispatcher::new(h.queue.clone(), h.processor.clone(), 1)
            .with_processing_delay(Duration::from_millis(100))
            .spawn(CancellationToken::new());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(h.store.get(id).await.unwrap().status, JobStatus::Pending);

        handle.await.unwrap();
        assert_eq!(h.store.get(id).await.unwrap().status, JobStatus::Completed);
    }
}
