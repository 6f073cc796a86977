//! Admin user blocking

use axum::{
    Json,
    extract::{Path, State},
};
use shared::error::AppError;
use shared::models::User;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;

async fn set_blocked(
    state: &AppState,
    admin: &CurrentUser,
    id: Uuid,
    blocked: bool,
) -> ServiceResult<Json<User>> {
    if admin.id == id {
        return Err(AppError::validation("Admins cannot block themselves").into());
    }
    let user = db::users::set_blocked(&state.pool, id, blocked)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    tracing::info!(user_id = %id, admin_id = %admin.id, blocked, "User block state changed");
    Ok(Json(user))
}

/// POST /api/admin/users/{id}/block
pub async fn block(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(id): Path<Uuid>,
) -> ServiceResult<Json<User>> {
    set_blocked(&state, &admin, id, true).await
}

/// POST /api/admin/users/{id}/unblock
pub async fn unblock(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(id): Path<Uuid>,
) -> ServiceResult<Json<User>> {
    set_blocked(&state, &admin, id, false).await
}
