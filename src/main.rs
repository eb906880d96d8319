use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use parcel_tracking_api::{
    app_state::AppState,
    config::AppConfig,
    routes,
    services::{
        dispatcher::Dispatcher, processor::JobProcessor, tracker::TrackerRegistry, ups::UpsTracker,
    },
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing parcel tracking API");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    metrics::describe_counter!("tracking_jobs_submitted_total", "Tracking jobs accepted");
    metrics::describe_counter!("tracking_jobs_completed_total", "Tracking jobs completed");
    metrics::describe_counter!("tracking_jobs_failed_total", "Tracking jobs that failed");
    metrics::describe_counter!(
        "tracking_queue_dropped_total",
        "Queued jobs evicted by queue overflow"
    );
    metrics::describe_gauge!("tracking_queue_depth", "Jobs waiting in the queue");
    metrics::describe_gauge!("tracking_jobs_in_flight", "Jobs currently being processed");
    metrics::describe_histogram!(
        "tracking_job_processing_seconds",
        "Time from pickup to terminal state"
    );

    // Carrier trackers
    tracing::info!("Initializing UPS tracker");
    let ups = UpsTracker::new(&config).expect("Failed to initialize UPS tracker");
    let trackers = TrackerRegistry::new().with(Arc::new(ups));
    tracing::info!(
        carriers = ?trackers.carriers().collect::<Vec<_>>(),
        "Carrier trackers registered"
    );

    let state = AppState::new(config);
    tracing::info!(
        queue_capacity = state.queue.capacity(),
        max_concurrent = state.config.max_concurrent_processing,
        "Job pipeline configured"
    );
    let shutdown = CancellationToken::new();

    // Background work: job dispatcher and expiry sweeper
    let processor = JobProcessor::new(state.store.clone(), Arc::new(trackers));
    let dispatcher = Dispatcher::from_config(state.queue.clone(), processor, &state.config)
        .spawn(shutdown.child_token());
    let sweeper = state.store.clone().spawn_sweeper(shutdown.child_token());

    let app = routes::router(state.clone(), Some(prometheus_handle));

    let bind_addr = state.config.bind_addr.clone();
    tracing::info!("Starting parcel tracking API on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // Stop taking new work and let in-flight lookups finish.
    tracing::info!("HTTP server stopped, draining tracking jobs");
    state.queue.close();
    shutdown.cancel();
    if let Err(e) = dispatcher.await {
        tracing::error!(error = %e, "Dispatcher task failed");
    }
    if let Err(e) = sweeper.await {
        tracing::error!(error = %e, "Expiry sweeper task failed");
    }
    tracing::info!("Shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
