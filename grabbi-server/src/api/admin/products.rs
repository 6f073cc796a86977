//! Admin product create/update/delete

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use shared::error::{AppError, ErrorCode};
use shared::models::{Product, ProductDraft, ProductInput};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::api::extract::{JsonBody, fields_error};
use crate::db;
use crate::error::{ServiceError, ServiceResult, unique_violation};
use crate::import::StoreError;
use crate::import::engine::generated_sku;
use crate::import::validate::validate_input;
use crate::state::AppState;

fn write_error(err: sqlx::Error) -> ServiceError {
    match unique_violation(&err) {
        Some("products_sku_key") => return AppError::new(ErrorCode::SkuExists).into(),
        Some("products_barcode_key") => return AppError::new(ErrorCode::BarcodeExists).into(),
        _ => {}
    }
    if let sqlx::Error::Database(db) = &err
        && db.code().as_deref() == Some("23503")
    {
        return AppError::new(ErrorCode::CategoryNotFound).into();
    }
    err.into()
}

async fn check_categories(conn: &mut PgConnection, draft: &ProductDraft) -> ServiceResult<()> {
    let ids = std::iter::once(draft.category_id).chain(draft.subcategory_id);
    for id in ids {
        if !db::categories::exists(&mut *conn, id).await? {
            return Err(AppError::new(ErrorCode::CategoryNotFound)
                .with_detail("category_id", id.to_string())
                .into());
        }
    }
    Ok(())
}

fn requested_sku(input: &ProductInput) -> Option<String> {
    shared::util::non_blank(input.sku.as_deref())
}

/// POST /api/admin/products
pub async fn create(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<ProductInput>,
) -> ServiceResult<(StatusCode, Json<Product>)> {
    let id = Uuid::new_v4();
    let sku = requested_sku(&input).unwrap_or_else(|| generated_sku(id));
    let draft = validate_input(&input, sku).map_err(fields_error)?;

    let mut tx = state.pool.begin().await?;
    check_categories(&mut tx, &draft).await?;
    db::products::insert(&mut tx, id, &draft)
        .await
        .map_err(write_error)?;
    tx.commit().await?;

    tracing::info!(product_id = %id, sku = %draft.sku, "Product created");
    let product = db::products::find_full(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::internal("Created product not readable"))?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/admin/products/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(input): JsonBody<ProductInput>,
) -> ServiceResult<Json<Product>> {
    let existing = db::products::find(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
    let sku = requested_sku(&input).unwrap_or(existing.sku);
    let draft = validate_input(&input, sku).map_err(fields_error)?;

    let mut tx = state.pool.begin().await?;
    check_categories(&mut tx, &draft).await?;
    let found = db::products::update(&mut tx, id, &draft)
        .await
        .map_err(write_error)?;
    if !found {
        return Err(AppError::new(ErrorCode::ProductNotFound).into());
    }
    tx.commit().await?;

    tracing::info!(product_id = %id, "Product updated");
    let product = db::products::find_full(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
    Ok(Json(product))
}

/// DELETE /api/admin/products/{id}
///
/// Refused with 409 while any order line references the product.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServiceResult<Json<serde_json::Value>> {
    match state.importer.safe_delete(id).await {
        Ok(()) => Ok(Json(serde_json::json!({ "deleted": id }))),
        Err(StoreError::Row { field, message }) if field == "product_id" => Err(
            AppError::with_message(ErrorCode::ProductReferenced, format!("Product is {message}"))
                .into(),
        ),
        Err(StoreError::Row { .. }) => Err(AppError::new(ErrorCode::ProductNotFound).into()),
        Err(StoreError::Unavailable(e)) => {
            tracing::error!(product_id = %id, error = %e, "Product delete failed");
            Err(AppError::new(ErrorCode::DatabaseError).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_error_passes_through_other_errors() {
        assert!(matches!(
            write_error(sqlx::Error::RowNotFound),
            ServiceError::Db(_)
        ));
    }
}
