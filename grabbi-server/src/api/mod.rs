//! HTTP API for grabbi-server

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod extract;
pub mod franchise;
pub mod franchises;
pub mod health;
pub mod orders;

use std::time::Duration;

use axum::{Router, middleware, routing::get};
use http::{HeaderName, HeaderValue};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::rate_limit::rate_limit;
use crate::state::AppState;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// List envelope used by every collection endpoint
#[derive(Debug, Serialize)]
pub struct Items<T> {
    pub items: Vec<T>,
}

#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    let x_request_id = HeaderName::from_static("x-request-id");

    Router::new()
        .route("/api/health", get(health::health_check))
        .merge(auth::router(state.clone()))
        .merge(catalog::router())
        .merge(franchises::router())
        .merge(cart::router(state.clone()))
        .merge(orders::router(state.clone()))
        .merge(admin::router(state.clone()))
        .merge(franchise::router(state.clone()))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, XRequestId))
}
