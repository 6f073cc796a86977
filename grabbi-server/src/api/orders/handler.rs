//! Order API Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use shared::error::{AppError, ErrorCode};
use shared::models::{LoyaltySummary, Order, OrderCreate, OrderStatusUpdate};
use uuid::Uuid;

use crate::api::Items;
use crate::api::extract::JsonBody;
use crate::auth::CurrentUser;
use crate::db;
use crate::db::orders::OrderScope;
use crate::error::ServiceResult;
use crate::orders;
use crate::state::AppState;

/// POST /api/orders
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(req): JsonBody<OrderCreate>,
) -> ServiceResult<(StatusCode, Json<Order>)> {
    let order = orders::create_order(&state.pool, &state.notifier, &user, &req).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/orders
pub async fn list_mine(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ServiceResult<Json<Items<Order>>> {
    let items = db::orders::list(&state.pool, OrderScope::User(user.id)).await?;
    Ok(Json(Items { items }))
}

/// GET /api/orders/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ServiceResult<Json<Order>> {
    let order = db::orders::find(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    orders::ensure_can_view(&user, &order)?;
    Ok(Json(order))
}

/// PATCH /api/orders/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<OrderStatusUpdate>,
) -> ServiceResult<Json<Order>> {
    let order = orders::transition(&state.pool, &state.notifier, &user, id, req.status).await?;
    Ok(Json(order))
}

/// GET /api/loyalty
pub async fn loyalty(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ServiceResult<Json<LoyaltySummary>> {
    let account = db::users::find(&state.pool, user.id)
        .await?
        .ok_or_else(AppError::not_authenticated)?;
    let history = db::loyalty::history(&state.pool, user.id).await?;
    Ok(Json(LoyaltySummary {
        points: account.loyalty_points,
        history,
    }))
}
