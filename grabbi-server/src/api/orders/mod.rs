//! Customer order and loyalty API

mod handler;

use axum::{
    Router, middleware,
    routing::{get, patch},
};

use crate::auth::policy::require_auth;
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/orders",
            get(handler::list_mine).post(handler::create),
        )
        .route("/api/orders/{id}", get(handler::get_by_id))
        .route("/api/orders/{id}/status", patch(handler::update_status))
        .route("/api/loyalty", get(handler::loyalty))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}
