//! Role and franchise authorization
//!
//! `require_auth` validates the bearer token and injects [`CurrentUser`] into
//! request extensions. The role middlewares run after it and check the
//! injected identity against a [`Policy`].

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use shared::error::{AppError, ErrorCode};
use shared::models::Role;
use uuid::Uuid;

use super::jwt::{Claims, extract_bearer};
use crate::state::AppState;

/// Authenticated identity taken from a valid access token
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub franchise_id: Option<Uuid>,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.user_id,
            email: claims.email,
            role: claims.role,
            franchise_id: claims.franchise_id,
        }
    }
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Franchise this user manages, if they are owner or staff of one
    pub fn managed_franchise(&self) -> Option<Uuid> {
        match self.role {
            Role::FranchiseOwner | Role::FranchiseStaff => self.franchise_id,
            Role::Customer | Role::Admin => None,
        }
    }

    /// Require that `franchise_id` is the caller's own franchise
    ///
    /// Cross-franchise access is 403, never 404.
    pub fn ensure_franchise_access(&self, franchise_id: Uuid) -> Result<(), AppError> {
        if self.is_admin() || self.managed_franchise() == Some(franchise_id) {
            return Ok(());
        }
        tracing::warn!(
            user_id = %self.id,
            franchise_id = %franchise_id,
            "Cross-franchise access denied"
        );
        Err(AppError::new(ErrorCode::FranchiseMismatch))
    }
}

/// Authorization policies layered after token validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Auth,
    Admin,
    Franchise,
    FranchiseOwner,
    AdminOrFranchise,
}

impl Policy {
    pub fn check(&self, user: &CurrentUser) -> Result<(), AppError> {
        let allowed = match self {
            Policy::Auth => true,
            Policy::Admin => user.is_admin(),
            Policy::Franchise => user.managed_franchise().is_some(),
            Policy::FranchiseOwner => {
                matches!(user.role, Role::FranchiseOwner) && user.franchise_id.is_some()
            }
            Policy::AdminOrFranchise => user.is_admin() || user.managed_franchise().is_some(),
        };
        if allowed {
            return Ok(());
        }

        tracing::warn!(user_id = %user.id, role = %user.role, policy = ?self, "Permission denied");
        Err(match self {
            Policy::Auth => AppError::not_authenticated(),
            Policy::Admin => AppError::new(ErrorCode::AdminRequired),
            Policy::Franchise | Policy::AdminOrFranchise => {
                AppError::new(ErrorCode::FranchiseRequired)
            }
            Policy::FranchiseOwner => AppError::new(ErrorCode::FranchiseOwnerRequired),
        })
    }
}

fn authenticate(state: &AppState, parts: &Parts) -> Result<CurrentUser, AppError> {
    let header = parts
        .headers
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(header) = header else {
        tracing::warn!(uri = %parts.uri, "Missing Authorization header");
        return Err(AppError::not_authenticated());
    };
    let token = extract_bearer(header)
        .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?;

    match state.tokens.validate_access(token) {
        Ok(claims) => Ok(CurrentUser::from(claims)),
        Err(e) => {
            tracing::warn!(uri = %parts.uri, error = %e, "Token validation failed");
            Err(e.into())
        }
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Already validated by middleware
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let user = authenticate(state, parts)?;
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

/// Require a valid access token; injects [`CurrentUser`]
pub async fn require_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let (mut parts, body) = req.into_parts();
    let user = authenticate(&state, &parts)?;
    parts.extensions.insert(user);
    Ok(next.run(Request::from_parts(parts, body)).await)
}

async fn enforce(policy: Policy, req: Request, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(AppError::not_authenticated)?;
    policy.check(user)?;
    Ok(next.run(req).await)
}

pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    enforce(Policy::Admin, req, next).await
}

pub async fn require_franchise(req: Request, next: Next) -> Result<Response, AppError> {
    enforce(Policy::Franchise, req, next).await
}

pub async fn require_franchise_owner(req: Request, next: Next) -> Result<Response, AppError> {
    enforce(Policy::FranchiseOwner, req, next).await
}

pub async fn require_admin_or_franchise(req: Request, next: Next) -> Result<Response, AppError> {
    enforce(Policy::AdminOrFranchise, req, next).await
}
