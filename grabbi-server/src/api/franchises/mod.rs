//! Public franchise directory

mod handler;

pub use handler::FranchiseDetail;

use axum::{Router, routing::get};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/franchises", get(handler::list))
        .route("/api/franchises/nearby", get(handler::nearby))
        .route("/api/franchises/{id}", get(handler::get_by_id))
}
