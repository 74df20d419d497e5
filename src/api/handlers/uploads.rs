use crate::AppState;
use crate::api::error::AppError;
use crate::services::upload::{
    CallerIdentity, CandidateFile, OutcomeAggregator, ProgressTracker, SessionStatus,
    TransferOrchestrator, TransferOutcome, TransferProgress, UploadSession,
};
use crate::utils::auth::Claims;
use crate::utils::validation::sanitize_filename;
use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::HeaderMap,
};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, ToSchema)]
pub struct UploadOutcomeResponse {
    pub name: String,
    pub stored: bool,
    pub storage_key: Option<String>,
    /// Stable failure tag (`storage_transfer_failed`, `metadata_persist_failed`, ...)
    pub error: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct UploadBatchResponse {
    pub session_id: String,
    pub status: SessionStatus,
    pub success_count: usize,
    pub failure_count: usize,
    pub files: Vec<UploadOutcomeResponse>,
}

/// Session id for the progress tracker: the client may name it up front via
/// header so it can poll while the batch is still in flight.
fn session_id_from(headers: &HeaderMap) -> String {
    headers
        .get("x-upload-session")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

#[utoipa::path(
    post,
    path = "/api/papers/upload",
    request_body(content = Multipart, description = "Batch of files in `file` fields"),
    responses(
        (status = 200, description = "Batch finished (possibly partially)", body = UploadBatchResponse),
        (status = 400, description = "No admissible files in the batch"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn upload_papers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadBatchResponse>, AppError> {
    let mut candidates = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = sanitize_filename(field.file_name().unwrap_or("unnamed"))
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let declared_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        candidates.push(CandidateFile::new(filename, declared_type, data));
    }

    if candidates.is_empty() {
        return Err(AppError::BadRequest("No file provided".to_string()));
    }

    let session = UploadSession::new(state.config.policy.clone());
    let admission = session.add(candidates)?;
    if !admission.rejected.is_empty() {
        // Wrong-type and over-limit candidates are filtered without a
        // per-file error, matching the picker behavior.
        tracing::debug!(
            "🚮 Filtered {} candidate(s) from upload batch",
            admission.rejected.len()
        );
    }
    if admission.admitted.is_empty() {
        return Err(AppError::BadRequest(
            "No admissible files in upload batch".to_string(),
        ));
    }

    let session_id = session_id_from(&headers);
    let tracker = Arc::new(ProgressTracker::new());
    state
        .active_uploads
        .insert(session_id.clone(), tracker.clone());

    let files = session.begin()?;
    let identity = CallerIdentity::new(claims.sub.clone());
    let orchestrator = TransferOrchestrator::new(
        state.storage.clone(),
        tracker,
        state.config.policy.transfer_concurrency,
    );
    let cancel = CancellationToken::new();

    let outcomes = match orchestrator.run(files, Some(&identity), &cancel).await {
        Ok(outcomes) => outcomes,
        Err(e) => {
            session.abort();
            state.active_uploads.remove(&session_id);
            return Err(e.into());
        }
    };

    let aggregator = OutcomeAggregator::new(state.metadata.clone());
    let outcomes = aggregator.persist(&identity, outcomes).await;
    let result = OutcomeAggregator::aggregate(&outcomes);
    session.complete(&outcomes, &result);
    state.active_uploads.remove(&session_id);

    tracing::info!(
        "📦 Upload session {} for {}: {} stored, {} failed",
        session_id,
        claims.sub,
        result.success_count,
        result.failure_count
    );

    let files = outcomes
        .into_iter()
        .map(|(queued, outcome)| match outcome {
            TransferOutcome::Success { storage_key } => UploadOutcomeResponse {
                name: queued.file.name,
                stored: true,
                storage_key: Some(storage_key),
                error: None,
            },
            TransferOutcome::Failure { reason } => UploadOutcomeResponse {
                name: queued.file.name,
                stored: false,
                storage_key: None,
                error: Some(reason.kind().to_string()),
            },
        })
        .collect();

    Ok(Json(UploadBatchResponse {
        session_id,
        status: result.status,
        success_count: result.success_count,
        failure_count: result.failure_count,
        files,
    }))
}

#[utoipa::path(
    get,
    path = "/api/uploads/{session_id}/progress",
    params(
        ("session_id" = String, Path, description = "Upload session ID")
    ),
    responses(
        (status = 200, description = "Per-file progress of an in-flight batch", body = Vec<TransferProgress>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown or finished session")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn upload_progress(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<TransferProgress>>, AppError> {
    let tracker = state
        .active_uploads
        .get(&session_id)
        .ok_or(AppError::NotFound("Unknown upload session".to_string()))?;

    Ok(Json(tracker.snapshot()))
}
