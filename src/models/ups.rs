//! Subset of the UPS web tracking payload that the mapper reads.
//!
//! The real response carries far more (addresses, progress bars, alerts);
//! anything not listed here is ignored on deserialization.

use serde::{Deserialize, Serialize};

/// Body POSTed to the UPS status endpoint.
#[derive(Debug, Serialize)]
pub struct UpsTrackRequest<'a> {
    #[serde(rename = "Locale")]
    pub locale: &'a str,
    #[serde(rename = "TrackingNumber")]
    pub tracking_number: [&'a str; 1],
    #[serde(rename = "isBarcodeScanned")]
    pub is_barcode_scanned: bool,
    #[serde(rename = "Requester")]
    pub requester: &'a str,
    #[serde(rename = "ClientUrl")]
    pub client_url: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsTrackResponse {
    #[serde(default)]
    pub status_code: Option<String>,
    #[serde(default)]
    pub status_text: Option<String>,
    #[serde(default)]
    pub track_details: Vec<UpsTrackDetail>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsTrackDetail {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_text: Option<String>,
    #[serde(default)]
    pub requested_tracking_number: String,
    #[serde(default)]
    pub package_status: String,
    #[serde(default)]
    pub milestones: Vec<UpsMilestone>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsMilestone {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub name: String,
}
