use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::api::{TrackingJobResponse, TrackingRequest, TrackingStatusResponse};
use crate::models::job::JobStatus;
use crate::routes::error::ApiError;

/// POST /tracking: accept a tracking request and return a job to poll.
pub async fn submit_tracking(
    State(state): State<AppState>,
    payload: Result<Json<TrackingRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    request
        .validate()
        .map_err(|report| ApiError::Validation(report.to_string()))?;

    let job = state
        .submit(request.tracking_number, request.carrier_code)
        .await;

    let status_url = format!("/tracking/{}", job.id);
    let expires_at = Utc::now()
        + chrono::Duration::from_std(state.store.sliding_expiration())
            .unwrap_or_else(|_| chrono::Duration::zero());

    let body = TrackingJobResponse {
        job_id: job.id,
        status: JobStatus::Pending,
        status_url: status_url.clone(),
        expires_at,
    };

    Ok((
        StatusCode::ACCEPTED,
        [(header::LOCATION, status_url)],
        Json(body),
    )
        .into_response())
}

/// GET /tracking/{job_id}: report job progress.
///
/// Completed jobs answer 200 with the result; pending and processing jobs
/// answer 202 echoing their status; failed and unknown jobs are errors.
pub async fn get_tracking_status(
    State(state): State<AppState>,
    job_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(job_id) = job_id.map_err(|e| ApiError::Validation(e.body_text()))?;

    let job = state.store.get(job_id).await.ok_or(ApiError::Gone(job_id))?;

    match job.status {
        JobStatus::Completed => {
            Ok((StatusCode::OK, Json(TrackingStatusResponse::from(job))).into_response())
        }
        JobStatus::Pending | JobStatus::Processing => {
            let location = format!("/tracking/{job_id}");
            Ok((
                StatusCode::ACCEPTED,
                [(header::LOCATION, location)],
                Json(TrackingStatusResponse::from(job)),
            )
                .into_response())
        }
        JobStatus::Failed => Err(ApiError::JobFailed {
            job_id,
            message: job
                .error
                .unwrap_or_else(|| "An error occurred while processing the tracking request.".to_string()),
        }),
    }
}
