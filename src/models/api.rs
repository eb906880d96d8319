use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::{Carrier, JobStatus, TrackingJob};
use crate::models::tracking::TrackingInfo;

/// Request to submit a parcel for tracking.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TrackingRequest {
    #[garde(ascii, alphanumeric, length(min = 1, max = 64))]
    pub tracking_number: String,

    #[garde(skip)]
    pub carrier_code: Carrier,
}

/// Response after submitting a tracking request.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingJobResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub status_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Response for querying job status.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TrackingInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<TrackingJob> for TrackingStatusResponse {
    fn from(job: TrackingJob) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            result: job.result,
            error_message: job.error,
            completed_at: job.completed_at,
        }
    }
}

/// JSON error body returned for every non-success outcome.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub title: String,
    pub status: u16,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}
