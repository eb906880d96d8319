//! UPS web tracking client.
//!
//! UPS does not hand out an anonymous tracking API. The public site sets an
//! anti-forgery cookie on its landing page, and the status endpoint only
//! answers requests that echo that cookie back in a header. Lookups therefore
//! take two round trips: fetch the landing page, then POST the status request.

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::config::AppConfig;
use crate::models::job::Carrier;
use crate::models::tracking::TrackingInfo;
use crate::models::ups::{UpsTrackRequest, UpsTrackResponse};
use crate::services::mapping;
use crate::services::tracker::{TrackError, Tracker};

/// Cookie carrying the anti-forgery token on the landing page response.
pub const XSRF_COOKIE: &str = "X-XSRF-TOKEN-ST";

/// Header the status endpoint expects the token in.
pub const XSRF_HEADER: &str = "X-XSRF-TOKEN";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";
const API_USER_AGENT: &str = "HTTPie/3.2.4";
const UPS_ORIGIN: &str = "https://www.ups.com";
const CLIENT_URL: &str = "https://www.ups.com/track?loc=en_US&requester=ST/";

pub struct UpsTracker {
    http: reqwest::Client,
    main_url: String,
    track_url: String,
}

impl UpsTracker {
    pub fn new(config: &AppConfig) -> Result<Self, TrackError> {
        // The status endpoint checks the token cookie against the header copy.
        let mut builder = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .cookie_store(true)
            .http1_only();

        if let Some(proxy_url) = config.proxy_url.as_deref().filter(|p| !p.is_empty()) {
            // Intercepting proxies re-sign TLS with their own certificate.
            builder = builder
                .proxy(reqwest::Proxy::all(proxy_url)?)
                .danger_accept_invalid_certs(true);
        }

        Ok(Self {
            http: builder.build()?,
            main_url: config.ups_main_url.clone(),
            track_url: config.ups_track_url.clone(),
        })
    }

    /// Step one: load the landing page and pull the token out of `Set-Cookie`.
    async fn fetch_token(&self) -> Result<String, TrackError> {
        let response = self
            .http
            .get(&self.main_url)
            .headers(browser_headers())
            .send()
            .await?;

        let cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok());

        find_xsrf_token(cookies).ok_or_else(|| {
            TrackError::Lookup(format!(
                "UPS landing page did not set the {XSRF_COOKIE} cookie (HTTP {})",
                response.status()
            ))
        })
    }

    /// Step two: ask the status endpoint for the raw tracking payload.
    async fn fetch_status(
        &self,
        token: &str,
        tracking_number: &str,
    ) -> Result<UpsTrackResponse, TrackError> {
        let body = UpsTrackRequest {
            locale: "en_US",
            tracking_number: [tracking_number],
            is_barcode_scanned: false,
            requester: "st",
            client_url: CLIENT_URL,
        };

        let token = HeaderValue::from_str(token)
            .map_err(|_| TrackError::Lookup("UPS anti-forgery token is not a valid header value".to_string()))?;

        let response = self
            .http
            .post(&self.track_url)
            .headers(api_headers())
            .header(XSRF_HEADER, token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackError::Lookup(format!(
                "UPS status endpoint returned HTTP {status}"
            )));
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl Tracker for UpsTracker {
    fn carrier(&self) -> Carrier {
        Carrier::Ups
    }

    async fn track(&self, tracking_number: &str) -> Result<TrackingInfo, TrackError> {
        let token = self.fetch_token().await?;
        tracing::debug!(tracking_number, "Obtained UPS anti-forgery token");

        let raw = self.fetch_status(&token, tracking_number).await?;
        mapping::ups_to_tracking(raw)
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(header::ORIGIN, HeaderValue::from_static(UPS_ORIGIN));
    headers
}

fn api_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(API_USER_AGENT));
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json, */*;q=0.5"));
    headers.insert(header::ORIGIN, HeaderValue::from_static(UPS_ORIGIN));
    headers
}

/// Find the anti-forgery token among raw `Set-Cookie` values.
pub fn find_xsrf_token<'a>(set_cookies: impl IntoIterator<Item = &'a str>) -> Option<String> {
    set_cookies
        .into_iter()
        .find(|cookie| starts_with_ignore_case(cookie, XSRF_COOKIE))
        .and_then(|cookie| extract_cookie_value(cookie, XSRF_COOKIE))
        .filter(|token| !token.is_empty())
}

/// Value of `name=...` inside a cookie header, up to the next `;`.
pub fn extract_cookie_value(cookie: &str, name: &str) -> Option<String> {
    let needle = format!("{}=", name.to_ascii_lowercase());
    let start = cookie.to_ascii_lowercase().find(&needle)? + needle.len();
    let rest = &cookie[start..];
    let end = rest.find(';').unwrap_or(rest.len());
    Some(rest[..end].to_string())
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    haystack
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
