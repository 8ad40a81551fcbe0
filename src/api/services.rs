use axum::{Json, extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse};
use std::collections::HashMap;
use tracing::info;

use super::{
    error::ApiError,
    models::{
        ClearResponse, DiscoverRequest, HealthResponse, JobAcceptedResponse, StartJobRequest,
        StopResponse,
    },
    state::AppState,
    utils::read_json,
    validation,
};

/// Start a download job (POST /jobs)
///
/// Returns 202 as soon as the job is scheduled; progress is read from
/// `GET /jobs/status`.
pub async fn start_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let limits = &state.config.server.api;
    let request: StartJobRequest =
        read_json(&headers, body, limits.max_payload_bytes.as_usize()).await?;
    validation::validate_start_request(&request, limits)?;

    let handle = state.jobs.start_job(request.selection, request.chunk)?;
    info!(job_id = %handle.job_id, "Job accepted");

    let response = JobAcceptedResponse {
        accepted: true,
        message: handle.message.clone(),
        job_id: handle.job_id.clone(),
    };
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Current job status (GET /jobs/status), with the log tail only
pub async fn job_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.jobs.status())
}

/// Results so far (GET /jobs/results); partial while running
pub async fn job_results(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.jobs.results())
}

/// POST /jobs/clear, 409 while a job is running
pub async fn clear_results(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state.jobs.clear_results()?;
    Ok(Json(ClearResponse { success: true }))
}

/// POST /jobs/stop
pub async fn stop_job(State(state): State<AppState>) -> impl IntoResponse {
    let stopped = state.jobs.stop();
    Json(StopResponse {
        stopped,
        status: state.jobs.tracker().state(),
    })
}

/// Enumerate one collection synchronously (POST /collections/discover)
pub async fn discover_collection(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let request: DiscoverRequest =
        read_json(&headers, body, state.config.server.api.max_payload_bytes.as_usize()).await?;
    validation::validate_discover_request(&request)?;

    let record = state.discoverer.discover(request.url.trim(), None).await?;
    Ok(Json(record))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let components = HashMap::from([
        ("api".to_string(), "healthy".to_string()),
        ("jobs".to_string(), "healthy".to_string()),
    ]);

    let response = HealthResponse {
        status: "healthy".to_string(),
        components,
        job_state: state.jobs.tracker().state(),
        metrics: state.metrics.snapshot(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (StatusCode::OK, Json(response))
}
