use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::tracking::TrackingInfo;

/// Status of a tracking job in the async pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, strum::Display)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether a job may move from `self` to `next`.
    ///
    /// Status only ever moves forward: `Pending -> Processing -> {Completed | Failed}`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

/// Carriers known to the API. Not every carrier has a tracker behind it.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
)]
pub enum Carrier {
    #[serde(rename = "UPS", alias = "ups", alias = "Ups")]
    #[strum(serialize = "UPS", ascii_case_insensitive)]
    Ups,
    #[serde(rename = "FedEx", alias = "fedex", alias = "FEDEX")]
    #[strum(serialize = "FedEx", ascii_case_insensitive)]
    FedEx,
}

/// What the client asked for. Immutable once the job exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobInput {
    pub tracking_number: String,
    pub carrier: Carrier,
}

/// A parcel tracking job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingJob {
    pub id: Uuid,
    #[serde(flatten)]
    pub input: JobInput,
    pub status: JobStatus,
    pub result: Option<TrackingInfo>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TrackingJob {
    /// Create a fresh `Pending` job with a new id.
    pub fn new(tracking_number: impl Into<String>, carrier: Carrier) -> Self {
        Self {
            id: Uuid::new_v4(),
            input: JobInput {
                tracking_number: tracking_number.into(),
                carrier,
            },
            status: JobStatus::Pending,
            result: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}
