//! Catalog API Handlers
//!
//! Every product read goes through the price resolver; with `franchise_id`
//! the franchise overlay decides price and availability.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{Category, Franchise, ProductQuery, ProductStatus, ProductView};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::Items;
use crate::catalog::product_view;
use crate::db;
use crate::db::products::ListFilter;
use crate::error::ServiceResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FranchiseScope {
    pub franchise_id: Option<Uuid>,
}

async fn active_franchise(pool: &PgPool, id: Uuid) -> ServiceResult<Franchise> {
    db::franchises::find(pool, id)
        .await?
        .filter(|f| f.is_active)
        .ok_or_else(|| AppError::new(ErrorCode::FranchiseNotFound).into())
}

/// GET /api/products
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> ServiceResult<Json<Items<ProductView>>> {
    let overlays = match query.franchise_id {
        Some(fid) => {
            active_franchise(&state.pool, fid).await?;
            Some(db::franchise_products::by_product(&state.pool, fid).await?)
        }
        None => None,
    };

    let filter = ListFilter {
        category_id: query.category_id,
        q: query.q.as_deref().filter(|q| !q.trim().is_empty()),
        public_only: true,
    };
    let products = db::products::list(&state.pool, &filter).await?;

    let now = Utc::now();
    let items = products
        .iter()
        .map(|p| {
            let overlay = overlays.as_ref().and_then(|o| o.get(&p.id));
            product_view(p, query.franchise_id, overlay, now)
        })
        .collect();
    Ok(Json(Items { items }))
}

/// GET /api/products/{id}
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(scope): Query<FranchiseScope>,
) -> ServiceResult<Json<ProductView>> {
    let product = db::products::find_full(&state.pool, id)
        .await?
        .filter(|p| p.status == ProductStatus::Active && p.online_visible)
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;

    let overlay = match scope.franchise_id {
        Some(fid) => {
            active_franchise(&state.pool, fid).await?;
            db::franchise_products::find(&state.pool, fid, id).await?
        }
        None => None,
    };
    Ok(Json(product_view(
        &product,
        scope.franchise_id,
        overlay.as_ref(),
        Utc::now(),
    )))
}

/// GET /api/categories
pub async fn list_categories(
    State(state): State<AppState>,
) -> ServiceResult<Json<Items<Category>>> {
    let items = db::categories::list(&state.pool).await?;
    Ok(Json(Items { items }))
}
