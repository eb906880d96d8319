use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::middleware;

pub mod error;
pub mod health;
pub mod metrics;
pub mod tracking;

/// Request bodies are a tracking number and a carrier code.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Build the HTTP API.
///
/// The metrics route is only mounted when a Prometheus handle is supplied.
pub fn router(state: AppState, prometheus: Option<Arc<PrometheusHandle>>) -> Router {
    let api = Router::new()
        .route("/tracking", post(tracking::submit_tracking))
        .route("/tracking/{job_id}", get(tracking::get_tracking_status))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_api_key,
        ));

    let mut app = Router::new()
        .merge(api)
        .route("/health", get(health::health_check))
        .route("/healthcheck", get(health::health_check))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::enforce_limits,
        ))
        .with_state(state);

    if let Some(handle) = prometheus {
        app = app.route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(handle),
        );
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}
