//! Admin promotion image uploads

use axum::{
    Json,
    extract::{Multipart, Query, State, multipart::MultipartError},
    http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};

use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub url: String,
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::with_message(ErrorCode::PayloadTooLarge, "File exceeds 5 MiB");
    }
    tracing::warn!(error = %err, "Malformed multipart upload");
    AppError::validation("invalid multipart body")
}

/// POST /api/admin/uploads/promotions
///
/// Multipart form with a single `file` field.
pub async fn upload_promotion(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ServiceResult<(StatusCode, Json<UploadResponse>)> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;

        let url = state
            .ingestor
            .upload_promotion(&filename, &content_type, bytes, Utc::now().timestamp())
            .await
            .map_err(AppError::from)?;
        tracing::info!(url = %url, "Promotion image uploaded");
        return Ok((StatusCode::CREATED, Json(UploadResponse { url })));
    }
    Err(AppError::validation("file is required").into())
}

/// DELETE /api/admin/uploads?url=
///
/// Images that order history still points at are kept.
pub async fn delete_upload(
    State(state): State<AppState>,
    Query(q): Query<DeleteQuery>,
) -> ServiceResult<Json<serde_json::Value>> {
    let url = state.ingestor.public_url(&q.url).map_err(AppError::from)?;
    if db::products::image_referenced(&state.pool, &url).await? {
        return Err(AppError::new(ErrorCode::ImageReferenced).into());
    }
    state.ingestor.delete(&url).await.map_err(AppError::from)?;
    tracing::info!(url = %url, "Uploaded image deleted");
    Ok(Json(serde_json::json!({ "message": "Image deleted" })))
}
