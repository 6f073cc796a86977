//! Admin API
//!
//! Batch import and job polling are shared with franchise staff; everything
//! else requires the admin role.

mod franchises;
mod import;
mod orders;
mod products;
mod uploads;
mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
};

use crate::auth::policy::{require_admin, require_admin_or_franchise, require_auth};
use crate::media::ingest::MAX_IMAGE_BYTES;
use crate::state::AppState;

/// Multipart framing on top of the largest accepted file
const UPLOAD_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 64 * 1024;

pub fn router(state: AppState) -> Router<AppState> {
    let shared = Router::new()
        .route("/products/batch-import", post(import::batch_import))
        .route("/jobs/{id}", get(import::get_job))
        .route_layer(middleware::from_fn(require_admin_or_franchise));

    let admin_only = Router::new()
        .route("/orders", get(orders::list))
        .route("/products", post(products::create))
        .route(
            "/products/{id}",
            put(products::update).delete(products::delete),
        )
        .route("/franchises", post(franchises::create))
        .route("/users/{id}/block", post(users::block))
        .route("/users/{id}/unblock", post(users::unblock))
        .route(
            "/uploads/promotions",
            post(uploads::upload_promotion).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/uploads", delete(uploads::delete_upload))
        .route_layer(middleware::from_fn(require_admin));

    Router::new().nest(
        "/api/admin",
        shared
            .merge(admin_only)
            .route_layer(middleware::from_fn_with_state(state, require_auth)),
    )
}
