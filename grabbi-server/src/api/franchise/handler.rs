//! Franchise Portal Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    FranchiseProduct, FranchiseProductUpdate, NewUser, Order, Product, ProductView, Role,
    StoreHours, StoreHoursInput, User, validate_week,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::Items;
use crate::api::extract::{JsonBody, ValidJson};
use crate::auth::CurrentUser;
use crate::auth::account;
use crate::catalog::product_view;
use crate::db;
use crate::db::orders::OrderScope;
use crate::db::products::ListFilter;
use crate::error::ServiceResult;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct StaffCreate {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
}

fn own_franchise(user: &CurrentUser) -> Result<Uuid, AppError> {
    user.managed_franchise()
        .ok_or_else(|| AppError::new(ErrorCode::FranchiseRequired))
}

/// Overrides follow the product rules against the effective retail price
fn check_overrides(product: &Product, update: &FranchiseProductUpdate) -> Result<(), AppError> {
    if update.stock_quantity < 0 {
        return Err(AppError::validation("stock_quantity must be 0 or greater"));
    }
    let min_price = Decimal::new(1, 2);
    if update.retail_price_override.is_some_and(|p| p < min_price) {
        return Err(AppError::with_message(
            ErrorCode::ProductInvalidPrice,
            "retail_price_override must be at least 0.01",
        ));
    }
    let retail = update.retail_price_override.unwrap_or(product.retail_price);
    let promotion = update
        .promotion_price_override
        .or(product.promotion_price);
    if let Some(promo) = promotion
        && (promo < min_price || promo >= retail)
    {
        return Err(AppError::with_message(
            ErrorCode::ProductInvalidPrice,
            "promotion price must be below the effective retail price",
        )
        .with_detail("retail_price", retail.to_string()));
    }
    if let (Some(start), Some(end)) = (
        update.promotion_start_override,
        update.promotion_end_override,
    ) && start > end
    {
        return Err(AppError::validation(
            "promotion_start_override must not be after promotion_end_override",
        ));
    }
    Ok(())
}

/// GET /api/franchise/orders
pub async fn list_orders(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ServiceResult<Json<Items<Order>>> {
    let fid = own_franchise(&user)?;
    let items = db::orders::list(&state.pool, OrderScope::Franchise(fid)).await?;
    Ok(Json(Items { items }))
}

/// GET /api/franchise/products
///
/// The whole catalog as this franchise sells it, including products it has
/// no overlay for yet.
pub async fn list_products(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ServiceResult<Json<Items<ProductView>>> {
    let fid = own_franchise(&user)?;
    let overlays = db::franchise_products::by_product(&state.pool, fid).await?;
    let filter = ListFilter {
        category_id: None,
        q: None,
        public_only: false,
    };
    let products = db::products::list(&state.pool, &filter).await?;

    let now = Utc::now();
    let items = products
        .iter()
        .map(|p| product_view(p, Some(fid), overlays.get(&p.id), now))
        .collect();
    Ok(Json(Items { items }))
}

/// PUT /api/franchise/products/{product_id}
pub async fn update_product(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(product_id): Path<Uuid>,
    JsonBody(update): JsonBody<FranchiseProductUpdate>,
) -> ServiceResult<Json<FranchiseProduct>> {
    let fid = own_franchise(&user)?;
    let product = db::products::find(&state.pool, product_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
    check_overrides(&product, &update)?;

    let row = db::franchise_products::upsert(&state.pool, fid, product_id, &update).await?;
    tracing::info!(
        franchise_id = %fid,
        product_id = %product_id,
        stock = row.stock_quantity,
        available = row.is_available,
        "Franchise product updated"
    );
    Ok(Json(row))
}

/// PUT /api/franchise/{id}/hours
pub async fn replace_hours(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    JsonBody(rows): JsonBody<Vec<StoreHoursInput>>,
) -> ServiceResult<Json<Items<StoreHours>>> {
    user.ensure_franchise_access(id)?;
    validate_week(&rows)
        .map_err(|msg| AppError::with_message(ErrorCode::InvalidStoreHours, msg))?;

    let mut tx = state.pool.begin().await?;
    let items = db::franchises::replace_hours(&mut tx, id, &rows).await?;
    tx.commit().await?;

    tracing::info!(franchise_id = %id, user_id = %user.id, "Store hours replaced");
    Ok(Json(Items { items }))
}

/// POST /api/franchise/staff
pub async fn create_staff(
    State(state): State<AppState>,
    owner: CurrentUser,
    ValidJson(req): ValidJson<StaffCreate>,
) -> ServiceResult<(StatusCode, Json<User>)> {
    let fid = own_franchise(&owner)?;
    let mut staff = NewUser::new(
        account::normalize_email(&req.email),
        account::hash(&req.password)?,
        req.name.trim().to_string(),
        Role::FranchiseStaff,
    );
    staff.franchise_id = Some(fid);

    let user = account::create_user(&state.pool, &staff).await?;
    tracing::info!(franchise_id = %fid, owner_id = %owner.id, staff_id = %user.id, "Staff account created");
    Ok((StatusCode::CREATED, Json(user)))
}
