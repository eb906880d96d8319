use garde::Validate;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    #[garde(length(min = 1))]
    pub bind_addr: String,

    /// When set, tracking routes require a matching `x-api-key` header.
    #[serde(default)]
    #[garde(skip)]
    pub api_key: Option<String>,

    /// Requests allowed per host within one rate-limit window.
    #[serde(default = "default_rate_limit")]
    #[garde(range(min = 1))]
    pub rate_limit: u32,

    #[serde(default = "default_rate_limit_window_minutes")]
    #[garde(range(min = 1))]
    pub rate_limit_window_minutes: u64,

    /// Requests allowed per UTC day across all hosts.
    #[serde(default = "default_daily_limit")]
    #[garde(range(min = 1))]
    pub daily_limit: u32,

    /// UPS landing page that issues the anti-forgery cookie.
    #[serde(default = "default_ups_main_url")]
    #[garde(length(min = 1))]
    pub ups_main_url: String,

    /// UPS status endpoint.
    #[serde(default = "default_ups_track_url")]
    #[garde(length(min = 1))]
    pub ups_track_url: String,

    /// Optional outbound proxy for carrier calls.
    #[serde(default)]
    #[garde(skip)]
    pub proxy_url: Option<String>,

    #[serde(default = "default_http_timeout_secs")]
    #[garde(range(min = 1))]
    pub http_timeout_secs: u64,

    /// Job queue capacity; the oldest entry is dropped beyond this.
    #[serde(default = "default_channel_capacity")]
    #[garde(range(min = 1))]
    pub channel_capacity: usize,

    /// Sliding job expiry. The hard ceiling is twice this.
    #[serde(default = "default_cache_expiration_minutes")]
    #[garde(range(min = 1))]
    pub cache_expiration_minutes: u64,

    #[serde(default = "default_max_concurrent_processing")]
    #[garde(range(min = 1))]
    pub max_concurrent_processing: usize,

    /// Pause before each carrier lookup. Zero disables it.
    #[serde(default = "default_processing_delay_ms")]
    #[garde(skip)]
    pub processing_delay_ms: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_rate_limit() -> u32 {
    50
}

fn default_rate_limit_window_minutes() -> u64 {
    1
}

fn default_daily_limit() -> u32 {
    990
}

fn default_ups_main_url() -> String {
    "https://www.ups.com/track?loc=en_US&requester=ST/".to_string()
}

fn default_ups_track_url() -> String {
    "https://webapis.ups.com/track/api/Track/GetStatus?loc=en_US".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_channel_capacity() -> usize {
    1000
}

fn default_cache_expiration_minutes() -> u64 {
    5
}

fn default_max_concurrent_processing() -> usize {
    10
}

fn default_processing_delay_ms() -> u64 {
    100
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            api_key: None,
            rate_limit: default_rate_limit(),
            rate_limit_window_minutes: default_rate_limit_window_minutes(),
            daily_limit: default_daily_limit(),
            ups_main_url: default_ups_main_url(),
            ups_track_url: default_ups_track_url(),
            proxy_url: None,
            http_timeout_secs: default_http_timeout_secs(),
            channel_capacity: default_channel_capacity(),
            cache_expiration_minutes: default_cache_expiration_minutes(),
            max_concurrent_processing: default_max_concurrent_processing(),
            processing_delay_ms: default_processing_delay_ms(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Build from explicit key/value pairs (upper-case env names).
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: AppConfig = envy::from_iter(vars)?;
        config.validate()?;
        Ok(config)
    }

    pub fn cache_expiration(&self) -> Duration {
        Duration::from_secs(self.cache_expiration_minutes * 60)
    }

    pub fn processing_delay(&self) -> Duration {
        Duration::from_millis(self.processing_delay_ms)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_minutes * 60)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] garde::Report),
}
