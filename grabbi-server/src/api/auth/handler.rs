//! Auth API Handlers

use axum::{Json, extract::State, http::StatusCode};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{NewUser, Role, User};
use validator::Validate;

use crate::api::extract::ValidJson;
use crate::auth::CurrentUser;
use crate::auth::account;
use crate::db;
use crate::email::Notification;
use crate::error::ServiceResult;
use crate::state::AppState;
use crate::util::{random_hex, sha256_hex};

const RESET_TOKEN_TTL_HOURS: i64 = 1;

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "refresh_token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "token is required"))]
    pub token: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: User,
}

fn tokens_for(state: &AppState, user: User) -> AppResult<AuthResponse> {
    Ok(AuthResponse {
        token: state.tokens.issue_access(&user)?,
        refresh_token: state.tokens.issue_refresh(&user)?,
        user,
    })
}

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<SignupRequest>,
) -> ServiceResult<(StatusCode, Json<AuthResponse>)> {
    let mut new_user = NewUser::new(
        account::normalize_email(&req.email),
        account::hash(&req.password)?,
        req.name.trim().to_string(),
        Role::Customer,
    );
    new_user.phone = req.phone.filter(|p| !p.trim().is_empty());

    let user = account::create_user(&state.pool, &new_user).await?;
    Ok((StatusCode::CREATED, Json(tokens_for(&state, user)?)))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> ServiceResult<Json<AuthResponse>> {
    let user = account::authenticate(&state.pool, &req.email, &req.password).await?;
    tracing::info!(user_id = %user.id, role = %user.role, "User logged in");
    Ok(Json(tokens_for(&state, user)?))
}

/// POST /api/auth/refresh
///
/// Claims are re-read from the database so role and franchise changes apply.
pub async fn refresh(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RefreshRequest>,
) -> ServiceResult<Json<serde_json::Value>> {
    let claims = state.tokens.validate_refresh(&req.refresh_token).map_err(|e| {
        tracing::warn!(error = %e, "Refresh token rejected");
        AppError::from(e)
    })?;
    let user = db::users::find(&state.pool, claims.user_id)
        .await?
        .ok_or_else(|| AppError::invalid_token("Account no longer exists"))?;
    if user.is_blocked {
        return Err(AppError::new(ErrorCode::AccountBlocked).into());
    }
    let token = state.tokens.issue_access(&user).map_err(AppError::from)?;
    Ok(Json(serde_json::json!({ "token": token })))
}

/// POST /api/auth/forgot-password
///
/// Always 200, whether or not the email belongs to an account.
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<ForgotPasswordRequest>,
) -> ServiceResult<Json<serde_json::Value>> {
    let email = account::normalize_email(&req.email);
    if let Some(user) = db::users::find_by_email(&state.pool, &email).await?
        && !user.is_blocked
    {
        let token = random_hex(32);
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
        db::password_resets::insert(&state.pool, &sha256_hex(&token), user.id, expires_at).await?;

        tracing::info!(user_id = %user.id, "Password reset requested");
        state.notifier.send(Notification::PasswordReset {
            to: user.email,
            name: user.name,
            reset_link: format!("{}/reset-password?token={token}", state.frontend_url),
        });
    }
    Ok(Json(serde_json::json!({
        "message": "If that email is registered, a reset link has been sent"
    })))
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<ResetPasswordRequest>,
) -> ServiceResult<Json<serde_json::Value>> {
    let password_hash = account::hash(&req.password)?;

    let mut tx = state.pool.begin().await?;
    let Some(user_id) =
        db::password_resets::consume(&mut *tx, &sha256_hex(&req.token), Utc::now()).await?
    else {
        tracing::warn!("Password reset with invalid or expired token");
        return Err(AppError::new(ErrorCode::ResetTokenInvalid).into());
    };
    db::users::set_password(&mut *tx, user_id, &password_hash).await?;
    tx.commit().await?;

    tracing::info!(user_id = %user_id, "Password reset completed");
    Ok(Json(serde_json::json!({ "message": "Password updated" })))
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> ServiceResult<Json<User>> {
    let user = db::users::find(&state.pool, user.id)
        .await?
        .ok_or_else(AppError::not_authenticated)?;
    Ok(Json(user))
}
