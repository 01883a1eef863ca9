//! Job API handlers.

use axum::{
    body::Body,
    extract::{multipart::Field, Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use remuxq_core::{
    EngineStatus, JobId, JobSnapshot, QueueError, QueueStats, SourceFile, MAX_SOURCE_SIZE_BYTES,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::state::AppState;

/// Name used for parts that carry neither a file name nor a field name.
const FALLBACK_FILE_NAME: &str = "upload";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Outcome of one uploaded file
#[derive(Debug, Serialize)]
pub struct SubmitResult {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response for a batch upload
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub accepted: usize,
    pub rejected: usize,
    pub results: Vec<SubmitResult>,
}

/// Response for listing jobs
#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<JobSnapshot>,
    pub stats: QueueStats,
    pub engine: EngineStatus,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct JobErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<JobErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(JobErrorResponse {
            error: message.into(),
        }),
    )
}

fn queue_error(err: QueueError) -> ApiError {
    let status = match err {
        QueueError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        QueueError::NotReady { .. } | QueueError::JobActive(_) => StatusCode::CONFLICT,
        QueueError::NotFound(_) => StatusCode::NOT_FOUND,
        QueueError::EngineInitFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    api_error(status, err.to_string())
}

fn parse_job_id(id: &str) -> Result<JobId, ApiError> {
    id.parse()
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, format!("Invalid job id: {}", id)))
}

/// Reads one multipart part. Bytes past the size cap are counted but not
/// kept, so an oversized file is rejected without being buffered.
async fn read_part(mut field: Field<'_>) -> Result<SourceFile, ApiError> {
    let name = field
        .file_name()
        .or_else(|| field.name())
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_FILE_NAME)
        .to_string();

    let mut bytes = Vec::new();
    let mut size_bytes: u64 = 0;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| api_error(e.status(), e.body_text()))?
    {
        size_bytes += chunk.len() as u64;
        if size_bytes <= MAX_SOURCE_SIZE_BYTES {
            bytes.extend_from_slice(&chunk);
        } else if !bytes.is_empty() {
            bytes = Vec::new();
        }
    }

    debug!(name = %name, size_bytes, "Received upload part");
    Ok(SourceFile {
        name,
        size_bytes,
        bytes,
    })
}

/// `Content-Disposition` for a download, with an RFC 5987 `filename*` for
/// names that are not plain ASCII.
fn content_disposition(file_name: &str) -> HeaderValue {
    let ascii: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    let value = if ascii == file_name {
        format!("attachment; filename=\"{}\"", ascii)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            ascii,
            urlencoding::encode(file_name)
        )
    };

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

// ============================================================================
// Handlers
// ============================================================================

/// Queue every file part of a multipart upload
pub async fn submit_jobs(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(e.status(), e.body_text()))?
    {
        files.push(read_part(field).await?);
    }

    if files.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "No files in request"));
    }

    let names: Vec<String> = files.iter().map(|file| file.name.clone()).collect();
    let outcomes = state.queue().submit(files);

    let results: Vec<SubmitResult> = names
        .into_iter()
        .zip(outcomes)
        .map(|(name, outcome)| match outcome {
            Ok(job_id) => SubmitResult {
                name,
                job_id: Some(job_id),
                error: None,
            },
            Err(e) => SubmitResult {
                name,
                job_id: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    let accepted = results.iter().filter(|r| r.job_id.is_some()).count();
    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            accepted,
            rejected: results.len() - accepted,
            results,
        }),
    ))
}

/// List the active queue followed by finished jobs
pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<ListJobsResponse> {
    let queue = state.queue();
    Json(ListJobsResponse {
        jobs: queue.jobs(),
        stats: queue.stats(),
        engine: queue.engine_status(),
    })
}

/// Get a job by ID
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobSnapshot>, ApiError> {
    let job_id = parse_job_id(&id)?;
    state
        .queue()
        .job(job_id)
        .map(Json)
        .ok_or_else(|| queue_error(QueueError::NotFound(job_id)))
}

/// Download the converted file of a completed job
pub async fn download_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let job_id = parse_job_id(&id)?;
    let artifact = state.queue().retrieve_result(job_id).map_err(queue_error)?;

    let content_type = HeaderValue::from_str(&artifact.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&artifact.file_name),
            ),
        ],
        Body::from(artifact.bytes),
    )
        .into_response())
}

/// Remove a finished job and its result (DELETE endpoint)
pub async fn dismiss_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobSnapshot>, ApiError> {
    let job_id = parse_job_id(&id)?;
    state.queue().dismiss(job_id).map(Json).map_err(queue_error)
}
