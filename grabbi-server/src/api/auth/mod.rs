//! Auth API

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::policy::require_auth;
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    let open = Router::new()
        .route("/signup", post(handler::signup))
        .route("/login", post(handler::login))
        .route("/refresh", post(handler::refresh))
        .route("/forgot-password", post(handler::forgot_password))
        .route("/reset-password", post(handler::reset_password));

    let authed = Router::new()
        .route("/me", get(handler::me))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new().nest("/api/auth", open.merge(authed))
}
