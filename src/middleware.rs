//! Request gatekeeping: API key, per-host rate limit, daily ceiling.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::app_state::AppState;
use crate::config::AppConfig;
use crate::routes::error::ApiError;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitExceeded {
    RateLimit,
    DailyLimit,
}

struct Window {
    started: Instant,
    hits: u32,
}

struct Counters {
    windows: HashMap<String, Window>,
    day: NaiveDate,
    day_hits: u32,
}

/// Fixed-window request counters keyed by `Host`, plus a process-wide daily total.
pub struct RequestLimiter {
    counters: Mutex<Counters>,
    per_window: u32,
    window: Duration,
    daily_limit: u32,
}

impl RequestLimiter {
    pub fn new(per_window: u32, window: Duration, daily_limit: u32) -> Self {
        Self {
            counters: Mutex::new(Counters {
                windows: HashMap::new(),
                day: Utc::now().date_naive(),
                day_hits: 0,
            }),
            per_window,
            window,
            daily_limit,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.rate_limit, config.rate_limit_window(), config.daily_limit)
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count one request from `host`, rejecting it if either limit is spent.
    pub fn check(&self, host: &str) -> Result<(), LimitExceeded> {
        self.check_on(host, Utc::now().date_naive())
    }

    fn check_on(&self, host: &str, today: NaiveDate) -> Result<(), LimitExceeded> {
        let now = Instant::now();
        let mut counters = self.lock();

        if counters.day != today {
            counters.day = today;
            counters.day_hits = 0;
        }
        if counters.day_hits >= self.daily_limit {
            return Err(LimitExceeded::DailyLimit);
        }

        let window = counters
            .windows
            .entry(host.to_string())
            .or_insert(Window { started: now, hits: 0 });
        if now.duration_since(window.started) >= self.window {
            window.started = now;
            window.hits = 0;
        }
        if window.hits >= self.per_window {
            return Err(LimitExceeded::RateLimit);
        }

        window.hits += 1;
        counters.day_hits += 1;

        let stale_after = self.window;
        if counters.windows.len() > 1024 {
            counters
                .windows
                .retain(|_, w| now.duration_since(w.started) < stale_after);
        }
        Ok(())
    }
}

/// Reject requests over the per-host or daily limit with 429.
pub async fn enforce_limits(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    match state.limiter.check(&host) {
        Ok(()) => Ok(next.run(request).await),
        Err(LimitExceeded::RateLimit) => {
            tracing::warn!(%host, "Rate limit exceeded");
            Err(ApiError::TooManyRequests("Too many requests".to_string()))
        }
        Err(LimitExceeded::DailyLimit) => {
            tracing::warn!("Daily request limit exceeded");
            Err(ApiError::TooManyRequests("Daily request limit hit".to_string()))
        }
    }
}

/// Require `x-api-key` to match the configured key, when one is configured.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.config.api_key.as_deref().filter(|k| !k.is_empty()) else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if provided == Some(expected) {
        Ok(next.run(request).await)
    } else {
        Err(ApiError::Unauthorized)
    }
}
