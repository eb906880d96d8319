//! Shared harness for in-process API tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use parcel_tracking_api::{
    app_state::AppState,
    config::AppConfig,
    models::{
        job::Carrier,
        tracking::{TrackingEvent, TrackingInfo, TrackingStatus},
    },
    routes,
    services::{
        dispatcher::Dispatcher,
        processor::JobProcessor,
        tracker::{TrackError, Tracker, TrackerRegistry},
    },
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use uuid::Uuid;

/// In-memory UPS stand-in that records how many lookups overlap.
pub struct StubTracker {
    delay: Duration,
    failure: Option<String>,
    active: AtomicUsize,
    pub peak: AtomicUsize,
    pub calls: AtomicUsize,
}

impl StubTracker {
    pub fn succeeding(delay: Duration) -> Self {
        Self {
            delay,
            failure: None,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::succeeding(Duration::from_millis(5))
        }
    }
}

#[async_trait]
impl Tracker for StubTracker {
    fn carrier(&self) -> Carrier {
        Carrier::Ups
    }

    async fn track(&self, tracking_number: &str) -> Result<TrackingInfo, TrackError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_active, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        if let Some(message) = &self.failure {
            return Err(TrackError::Lookup(message.clone()));
        }

        let event = TrackingEvent {
            date: chrono::NaiveDate::from_ymd_opt(2024, 3, 14)
                .and_then(|d| d.and_hms_opt(14, 5, 0)),
            description: "Delivered".to_string(),
            location: "Portland, OR".to_string(),
            country: "US".to_string(),
        };
        Ok(TrackingInfo::normalize(
            tracking_number,
            Carrier::Ups,
            TrackingStatus::Delivered,
            vec![event],
        ))
    }
}

/// A running API with its dispatcher.
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub tracker: Arc<StubTracker>,
    pub shutdown: CancellationToken,
    pub dispatcher: JoinHandle<()>,
}

/// Defaults with the per-lookup pause disabled so tests run quickly.
pub fn test_config() -> AppConfig {
    AppConfig {
        processing_delay_ms: 0,
        ..AppConfig::default()
    }
}

pub fn spawn_app(config: AppConfig, tracker: StubTracker) -> TestApp {
    let tracker = Arc::new(tracker);
    let state = AppState::new(config);
    let shutdown = CancellationToken::new();

    let registry = TrackerRegistry::new().with(tracker.clone());
    let processor = JobProcessor::new(state.store.clone(), Arc::new(registry));
    let dispatcher = Dispatcher::from_config(state.queue.clone(), processor, &state.config)
        .spawn(shutdown.child_token());

    TestApp {
        router: routes::router(state.clone(), None),
        state,
        tracker,
        shutdown,
        dispatcher,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, location, body)
    }

    pub async fn submit(&self, tracking_number: &str, carrier_code: &str) -> (StatusCode, Option<String>, Value) {
        let body = serde_json::json!({
            "trackingNumber": tracking_number,
            "carrierCode": carrier_code,
        });
        self.send(json_request(Method::POST, "/tracking", body.to_string()))
            .await
    }

    pub async fn submit_ok(&self, tracking_number: &str, carrier_code: &str) -> Uuid {
        let (status, _, body) = self.submit(tracking_number, carrier_code).await;
        assert_eq!(status, StatusCode::ACCEPTED, "unexpected submit response: {body}");
        body["jobId"].as_str().unwrap().parse().unwrap()
    }

    pub async fn status(&self, job_id: &str) -> (StatusCode, Option<String>, Value) {
        self.send(get_request(&format!("/tracking/{job_id}"))).await
    }

    /// Poll until the job stops answering 202, collecting every status seen.
    pub async fn poll_until_done(&self, job_id: Uuid) -> (StatusCode, Value, Vec<String>) {
        let mut seen = Vec::new();
        for _ in 0..500 {
            let (status, _, body) = self.status(&job_id.to_string()).await;
            if status != StatusCode::ACCEPTED {
                return (status, body, seen);
            }
            seen.push(body["status"].as_str().unwrap_or_default().to_string());
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {job_id} never reached a terminal state");
    }

    pub async fn stop(self) {
        self.shutdown.cancel();
        self.dispatcher.await.unwrap();
    }
}

pub fn json_request(method: Method, uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}
