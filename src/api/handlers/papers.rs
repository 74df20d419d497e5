use crate::AppState;
use crate::api::error::AppError;
use crate::entities::papers;
use crate::utils::auth::Claims;
use axum::{
    Extension, Json,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
};
use chrono::Utc;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use serde::Serialize;
use tokio_util::io::ReaderStream;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct PaperResponse {
    pub id: String,
    pub title: String,
    pub size_bytes: i64,
    pub declared_type: String,
    pub is_favorite: bool,
    pub created_at: chrono::DateTime<Utc>,
}

impl From<papers::Model> for PaperResponse {
    fn from(model: papers::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            size_bytes: model.size_bytes,
            declared_type: model.declared_type,
            is_favorite: model.is_favorite,
            created_at: model.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct SetFavoriteRequest {
    pub favorite: bool,
}

#[utoipa::path(
    get,
    path = "/api/papers",
    responses(
        (status = 200, description = "The caller's papers, newest first", body = Vec<PaperResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn list_papers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<PaperResponse>>, AppError> {
    let records = state
        .metadata
        .list_for_owner(&claims.sub)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(records.into_iter().map(PaperResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/papers/{id}/download",
    params(
        ("id" = String, Path, description = "Paper ID")
    ),
    responses(
        (status = 200, description = "Paper byte stream"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Paper not found")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn download_paper(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(paper_id): Path<String>,
) -> Result<Response, AppError> {
    let paper = state
        .metadata
        .find_for_owner(&claims.sub, &paper_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or(AppError::NotFound("Paper not found".to_string()))?;

    let stream = state.storage.get(&paper.storage_key).await.map_err(|e| {
        tracing::error!("Storage read failed for {}: {}", paper.storage_key, e);
        AppError::Internal("Failed to read stored object".to_string())
    })?;

    let extension = paper
        .storage_key
        .rsplit('.')
        .next()
        .unwrap_or("pdf")
        .to_string();
    let filename = format!("{}.{}", paper.title, extension);
    let encoded = utf8_percent_encode(&filename, NON_ALPHANUMERIC);

    let body = Body::from_stream(ReaderStream::new(stream.into_async_read()));
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, paper.declared_type.clone())
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename*=UTF-8''{}", encoded),
        )
        .header(header::CONTENT_LENGTH, paper.size_bytes)
        .body(body)
        .map_err(|e| AppError::Internal(e.to_string()))
}

#[utoipa::path(
    put,
    path = "/api/papers/{id}/favorite",
    params(
        ("id" = String, Path, description = "Paper ID")
    ),
    request_body = SetFavoriteRequest,
    responses(
        (status = 200, description = "Updated paper", body = PaperResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Paper not found")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn set_favorite(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(paper_id): Path<String>,
    Json(req): Json<SetFavoriteRequest>,
) -> Result<Json<PaperResponse>, AppError> {
    let updated = state
        .metadata
        .set_favorite(&claims.sub, &paper_id, req.favorite)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or(AppError::NotFound("Paper not found".to_string()))?;

    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/api/papers/{id}",
    params(
        ("id" = String, Path, description = "Paper ID")
    ),
    responses(
        (status = 204, description = "Paper deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Paper not found")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn delete_paper(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(paper_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let removed = state
        .metadata
        .delete(&claims.sub, &paper_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or(AppError::NotFound("Paper not found".to_string()))?;

    // Best effort: a dangling object without a catalog entry is unreachable
    // anyway, so a failed cleanup only warrants a warning.
    if let Err(e) = state.storage.delete(&removed.storage_key).await {
        tracing::warn!(
            "🧹 Failed to delete stored object {}: {}",
            removed.storage_key,
            e
        );
    }

    Ok(StatusCode::NO_CONTENT)
}
