use axum::{Json, extract::State};
use shared::models::Order;

use crate::api::Items;
use crate::db;
use crate::db::orders::OrderScope;
use crate::error::ServiceResult;
use crate::state::AppState;

/// GET /api/admin/orders
pub async fn list(State(state): State<AppState>) -> ServiceResult<Json<Items<Order>>> {
    let items = db::orders::list(&state.pool, OrderScope::All).await?;
    Ok(Json(Items { items }))
}
