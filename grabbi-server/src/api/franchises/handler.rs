//! Franchise API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{Franchise, NearbyFranchise, StoreHours};
use uuid::Uuid;

use crate::api::Items;
use crate::catalog::geo;
use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Serialize)]
pub struct FranchiseDetail {
    #[serde(flatten)]
    pub franchise: Franchise,
    pub hours: Vec<StoreHours>,
}

/// GET /api/franchises
pub async fn list(State(state): State<AppState>) -> ServiceResult<Json<Items<Franchise>>> {
    let items = db::franchises::list_active(&state.pool).await?;
    Ok(Json(Items { items }))
}

/// GET /api/franchises/nearby?lat=&lng=
pub async fn nearby(
    State(state): State<AppState>,
    Query(q): Query<NearbyQuery>,
) -> ServiceResult<Json<Items<NearbyFranchise>>> {
    if !(-90.0..=90.0).contains(&q.lat) || !(-180.0..=180.0).contains(&q.lng) {
        return Err(AppError::validation("lat/lng out of range").into());
    }
    let active = db::franchises::list_active(&state.pool).await?;
    Ok(Json(Items {
        items: geo::candidates(active, q.lat, q.lng),
    }))
}

/// GET /api/franchises/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServiceResult<Json<FranchiseDetail>> {
    let franchise = db::franchises::find(&state.pool, id)
        .await?
        .filter(|f| f.is_active)
        .ok_or_else(|| AppError::new(ErrorCode::FranchiseNotFound))?;
    let hours = db::franchises::hours(&state.pool, id).await?;
    Ok(Json(FranchiseDetail { franchise, hours }))
}
