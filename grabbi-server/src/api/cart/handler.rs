//! Cart API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use shared::error::{AppError, ErrorCode};
use shared::models::{CartAdd, CartItem, CartLine, CartQuantity, CartView, ProductStatus};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::extract::JsonBody;
use crate::auth::CurrentUser;
use crate::catalog::{EffectivePricing, product_view};
use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;

fn check_quantity(quantity: i32) -> Result<(), AppError> {
    if quantity < 1 {
        return Err(AppError::validation("quantity must be at least 1"));
    }
    Ok(())
}

/// A cart holds products of at most one franchise
pub fn check_franchise_mix(
    existing: &[CartItem],
    product_id: Uuid,
    franchise_id: Option<Uuid>,
) -> Result<(), AppError> {
    let conflict = existing
        .iter()
        .filter(|item| item.product_id != product_id)
        .any(|item| item.franchise_id != franchise_id);
    if conflict {
        return Err(AppError::with_message(
            ErrorCode::MixedFranchiseCart,
            "Cart already holds products from another store",
        ));
    }
    Ok(())
}

/// Resolve every line against the current catalog; vanished products drop out
async fn load_cart(pool: &PgPool, user_id: Uuid) -> ServiceResult<CartView> {
    let now = Utc::now();
    let mut lines = Vec::new();
    for item in db::cart::list(pool, user_id).await? {
        let Some(product) = db::products::find_full(pool, item.product_id).await? else {
            continue;
        };
        let overlay = match item.franchise_id {
            Some(fid) => db::franchise_products::find(pool, fid, product.id).await?,
            None => None,
        };
        let price = EffectivePricing::resolve(&product, overlay.as_ref()).current_price(now);
        lines.push(CartLine {
            product: product_view(&product, item.franchise_id, overlay.as_ref(), now),
            quantity: item.quantity,
            line_total: price * rust_decimal::Decimal::from(item.quantity),
        });
    }
    Ok(CartView::from_lines(lines))
}

/// GET /api/cart
pub async fn get_cart(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ServiceResult<Json<CartView>> {
    Ok(Json(load_cart(&state.pool, user.id).await?))
}

/// POST /api/cart
pub async fn add_item(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(req): JsonBody<CartAdd>,
) -> ServiceResult<Json<CartView>> {
    check_quantity(req.quantity)?;

    let mut tx = state.pool.begin().await?;
    if !db::users::lock(&mut tx, user.id).await? {
        return Err(AppError::not_authenticated().into());
    }

    db::products::find(&mut *tx, req.product_id)
        .await?
        .filter(|p| p.status == ProductStatus::Active && p.online_visible)
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;

    if let Some(fid) = req.franchise_id {
        let overlay = db::franchise_products::find(&mut *tx, fid, req.product_id).await?;
        if !overlay.is_some_and(|o| o.is_available) {
            return Err(AppError::new(ErrorCode::ProductUnavailable).into());
        }
    }

    let existing = db::cart::list(&mut *tx, user.id).await?;
    check_franchise_mix(&existing, req.product_id, req.franchise_id)?;

    db::cart::add(&mut *tx, user.id, req.product_id, req.franchise_id, req.quantity).await?;
    tx.commit().await?;

    Ok(Json(load_cart(&state.pool, user.id).await?))
}

/// PUT /api/cart/{product_id}
pub async fn set_quantity(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(product_id): Path<Uuid>,
    JsonBody(req): JsonBody<CartQuantity>,
) -> ServiceResult<Json<CartView>> {
    check_quantity(req.quantity)?;

    let mut tx = state.pool.begin().await?;
    if !db::users::lock(&mut tx, user.id).await? {
        return Err(AppError::not_authenticated().into());
    }
    if !db::cart::set_quantity(&mut *tx, user.id, product_id, req.quantity).await? {
        return Err(AppError::not_found("Cart item").into());
    }
    tx.commit().await?;

    Ok(Json(load_cart(&state.pool, user.id).await?))
}

/// DELETE /api/cart/{product_id}
pub async fn remove_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> ServiceResult<Json<CartView>> {
    let mut tx = state.pool.begin().await?;
    if !db::users::lock(&mut tx, user.id).await? {
        return Err(AppError::not_authenticated().into());
    }
    if !db::cart::remove(&mut *tx, user.id, product_id).await? {
        return Err(AppError::not_found("Cart item").into());
    }
    tx.commit().await?;

    Ok(Json(load_cart(&state.pool, user.id).await?))
}

/// DELETE /api/cart
pub async fn clear(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ServiceResult<Json<CartView>> {
    let mut tx = state.pool.begin().await?;
    if !db::users::lock(&mut tx, user.id).await? {
        return Err(AppError::not_authenticated().into());
    }
    db::cart::clear(&mut *tx, user.id).await?;
    tx.commit().await?;

    Ok(Json(CartView::from_lines(Vec::new())))
}
