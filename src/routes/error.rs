use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use crate::models::api::ErrorResponse;

/// Every non-success HTTP outcome.
///
/// Job status and transport status stay separate: the mapping from a job's
/// terminal state to a response code lives only here.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Missing or invalid API key")]
    Unauthorized,

    #[error("Tracking job {0} has expired or does not exist")]
    Gone(Uuid),

    #[error("Tracking job {job_id} failed: {message}")]
    JobFailed { job_id: Uuid, message: String },

    #[error("{0}")]
    TooManyRequests(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Gone(_) => StatusCode::GONE,
            ApiError::JobFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn body(&self) -> ErrorResponse {
        let (title, details, instance) = match self {
            ApiError::Validation(details) => ("Invalid Request", details.clone(), None),
            ApiError::Unauthorized => ("Unauthorized", self.to_string(), None),
            ApiError::Gone(job_id) => (
                "Tracking Job Not Found",
                "Tracking job has expired or does not exist. Results are only kept for a limited time after submission.".to_string(),
                Some(format!("/tracking/{job_id}")),
            ),
            ApiError::JobFailed { job_id, message } => (
                "Tracking Job Failed",
                message.clone(),
                Some(format!("/tracking/{job_id}")),
            ),
            ApiError::TooManyRequests(details) => ("Too Many Requests", details.clone(), None),
        };

        ErrorResponse {
            title: title.to_string(),
            status: self.status().as_u16(),
            details,
            instance,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
