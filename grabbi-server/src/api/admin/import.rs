//! Batch import submission and job polling

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{BatchImportAccepted, BatchImportRequest, BatchJob};
use uuid::Uuid;

use crate::api::extract::JsonBody;
use crate::auth::CurrentUser;
use crate::import::ImportScope;
use crate::state::AppState;

/// Admins import into the global catalog; franchise staff into their own store
fn scope_for(user: &CurrentUser) -> AppResult<ImportScope> {
    if user.is_admin() {
        return Ok(ImportScope::Global);
    }
    user.managed_franchise()
        .map(ImportScope::Franchise)
        .ok_or_else(|| AppError::new(ErrorCode::FranchiseRequired))
}

/// POST /api/admin/products/batch-import
pub async fn batch_import(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(req): JsonBody<BatchImportRequest>,
) -> AppResult<(StatusCode, Json<BatchImportAccepted>)> {
    let scope = scope_for(&user)?;
    let rows = req.products.len();
    let job_id = state.importer.submit(req, scope).await?;
    tracing::info!(job_id = %job_id, user_id = %user.id, rows, scope = ?scope, "Batch import accepted");
    Ok((StatusCode::ACCEPTED, Json(BatchImportAccepted { job_id })))
}

/// Admins see every job; franchise members only their franchise's jobs
fn ensure_job_access(user: &CurrentUser, job: &BatchJob) -> AppResult<()> {
    match job.franchise_id {
        Some(franchise_id) => user.ensure_franchise_access(franchise_id),
        None if user.is_admin() => Ok(()),
        None => {
            tracing::warn!(user_id = %user.id, job_id = %job.id, "Admin job access denied");
            Err(AppError::new(ErrorCode::FranchiseMismatch))
        }
    }
}

/// GET /api/admin/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BatchJob>> {
    let job = state
        .importer
        .jobs()
        .get(id)
        .await
        .ok_or_else(|| AppError::new(ErrorCode::JobNotFound))?;
    ensure_job_access(&user, &job)?;
    Ok(Json(job))
}
