//! Shopping cart API
//!
//! Every mutation locks the caller's user row, so concurrent cart edits of one
//! user apply one after another.

mod handler;

use axum::{
    Router, middleware,
    routing::{get, put},
};

use crate::auth::policy::require_auth;
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new().nest("/api/cart", cart_routes()).route_layer(
        middleware::from_fn_with_state(state, require_auth),
    )
}

fn cart_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handler::get_cart)
                .post(handler::add_item)
                .delete(handler::clear),
        )
        .route(
            "/{product_id}",
            put(handler::set_quantity).delete(handler::remove_item),
        )
}
