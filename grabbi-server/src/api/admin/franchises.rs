//! Admin franchise creation

use axum::{Json, extract::State, http::StatusCode};
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{FranchiseCreate, Role, default_week};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::api::extract::{JsonBody, fields_error};
use crate::api::franchises::FranchiseDetail;
use crate::db;
use crate::error::{ServiceResult, unique_violation};
use crate::state::AppState;

fn check_input(input: &FranchiseCreate) -> Result<(), AppError> {
    let mut fields = BTreeMap::new();
    if input.name.trim().is_empty() {
        fields.insert("name".to_string(), "name is required".to_string());
    }
    let slug_ok = !input.slug.is_empty()
        && input
            .slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !slug_ok {
        fields.insert(
            "slug".to_string(),
            "slug must be lowercase letters, digits and dashes".to_string(),
        );
    }
    if !(-90.0..=90.0).contains(&input.latitude) || !(-180.0..=180.0).contains(&input.longitude)
    {
        fields.insert("latitude".to_string(), "coordinates out of range".to_string());
    }
    if input.delivery_radius_km <= 0.0 {
        fields.insert(
            "delivery_radius_km".to_string(),
            "delivery_radius_km must be greater than 0".to_string(),
        );
    }
    if input.delivery_fee < Decimal::ZERO {
        fields.insert(
            "delivery_fee".to_string(),
            "delivery_fee must be 0 or greater".to_string(),
        );
    }
    if input.free_delivery_min.is_some_and(|m| m < Decimal::ZERO) {
        fields.insert(
            "free_delivery_min".to_string(),
            "free_delivery_min must be 0 or greater".to_string(),
        );
    }
    if fields.is_empty() {
        Ok(())
    } else {
        Err(fields_error(fields))
    }
}

/// POST /api/admin/franchises
///
/// Creates the franchise with a default week of opening hours and makes
/// `owner_id` its owner.
pub async fn create(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<FranchiseCreate>,
) -> ServiceResult<(StatusCode, Json<FranchiseDetail>)> {
    check_input(&input)?;

    let mut tx = state.pool.begin().await?;
    let owner = db::users::find(&mut *tx, input.owner_id)
        .await?
        .ok_or_else(|| AppError::validation("owner_id does not match a user"))?;
    if owner.role == Role::Admin {
        return Err(AppError::validation("owner_id must not be an admin").into());
    }
    if owner.franchise_id.is_some() {
        return Err(AppError::validation("owner already belongs to a franchise").into());
    }

    let id = Uuid::new_v4();
    let franchise = match db::franchises::insert(&mut *tx, id, &input).await {
        Ok(f) => f,
        Err(e) if unique_violation(&e) == Some("franchises_slug_key") => {
            return Err(AppError::new(ErrorCode::FranchiseSlugExists).into());
        }
        Err(e) => return Err(e.into()),
    };
    let hours = default_week(id);
    db::franchises::insert_hours(&mut tx, &hours).await?;
    db::users::assign_franchise(&mut *tx, owner.id, Role::FranchiseOwner, id).await?;
    tx.commit().await?;

    tracing::info!(franchise_id = %id, slug = %franchise.slug, owner_id = %owner.id, "Franchise created");
    Ok((StatusCode::CREATED, Json(FranchiseDetail { franchise, hours })))
}
