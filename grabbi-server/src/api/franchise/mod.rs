//! Franchise portal API
//!
//! Owners and staff manage their own franchise; hours and staff accounts are
//! owner-only.

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::auth::policy::{require_auth, require_franchise, require_franchise_owner};
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    let owner_only = Router::new()
        .route("/{id}/hours", put(handler::replace_hours))
        .route("/staff", post(handler::create_staff))
        .route_layer(middleware::from_fn(require_franchise_owner));

    let routes = Router::new()
        .route("/orders", get(handler::list_orders))
        .route("/products", get(handler::list_products))
        .route("/products/{product_id}", put(handler::update_product))
        .merge(owner_only)
        .route_layer(middleware::from_fn(require_franchise))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new().nest("/api/franchise", routes)
}
