//! Product Model
//!
//! Global catalog entities, the per-franchise overlay, and the resolved
//! [`ProductView`] returned by every product read.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "text", rename_all = "snake_case"))]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
}

/// Category entity (subcategories carry a parent)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<Uuid>,
}

/// Product image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ProductImage {
    pub id: Uuid,
    pub product_id: Uuid,
    pub url: String,
    pub is_primary: bool,
    pub sort_order: i32,
}

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub cost_price: Decimal,
    pub retail_price: Decimal,
    pub promotion_price: Option<Decimal>,
    pub promotion_start: Option<DateTime<Utc>>,
    pub promotion_end: Option<DateTime<Utc>>,
    pub stock_quantity: i32,
    pub reorder_level: i32,
    pub category_id: Uuid,
    pub subcategory_id: Option<Uuid>,
    pub is_vegan: bool,
    pub is_gluten_free: bool,
    pub is_age_restricted: bool,
    pub minimum_age: Option<i32>,
    pub status: ProductStatus,
    pub online_visible: bool,
    pub barcode: Option<String>,

    // -- Relations (populated by application code, skipped by FromRow) --
    #[cfg_attr(feature = "db", sqlx(skip))]
    #[serde(default)]
    pub images: Vec<ProductImage>,
}

impl Product {
    /// URL of the primary image, falling back to the first image
    pub fn primary_image_url(&self) -> Option<&str> {
        self.images
            .iter()
            .find(|img| img.is_primary)
            .or_else(|| self.images.first())
            .map(|img| img.url.as_str())
    }
}

/// Fields written on product create/update
///
/// Produced by validation (admin endpoint and batch import) so the store
/// layer only ever sees rows that satisfy the product invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub cost_price: Decimal,
    pub retail_price: Decimal,
    pub promotion_price: Option<Decimal>,
    pub promotion_start: Option<DateTime<Utc>>,
    pub promotion_end: Option<DateTime<Utc>>,
    pub stock_quantity: i32,
    pub reorder_level: i32,
    pub category_id: Uuid,
    pub subcategory_id: Option<Uuid>,
    pub is_vegan: bool,
    pub is_gluten_free: bool,
    pub is_age_restricted: bool,
    pub minimum_age: Option<i32>,
    pub status: ProductStatus,
    pub online_visible: bool,
    pub barcode: Option<String>,
}

/// Admin create/update payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInput {
    pub sku: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub cost_price: Decimal,
    pub retail_price: Decimal,
    pub promotion_price: Option<Decimal>,
    pub promotion_start: Option<DateTime<Utc>>,
    pub promotion_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default)]
    pub reorder_level: i32,
    pub category_id: Uuid,
    pub subcategory_id: Option<Uuid>,
    #[serde(default)]
    pub is_vegan: bool,
    #[serde(default)]
    pub is_gluten_free: bool,
    #[serde(default)]
    pub is_age_restricted: bool,
    pub minimum_age: Option<i32>,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default = "default_true")]
    pub online_visible: bool,
    pub barcode: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Per-franchise overlay on a global product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct FranchiseProduct {
    pub franchise_id: Uuid,
    pub product_id: Uuid,
    pub retail_price_override: Option<Decimal>,
    pub promotion_price_override: Option<Decimal>,
    pub promotion_start_override: Option<DateTime<Utc>>,
    pub promotion_end_override: Option<DateTime<Utc>>,
    pub stock_quantity: i32,
    pub is_available: bool,
}

/// Franchise override payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FranchiseProductUpdate {
    pub retail_price_override: Option<Decimal>,
    pub promotion_price_override: Option<Decimal>,
    pub promotion_start_override: Option<DateTime<Utc>>,
    pub promotion_end_override: Option<DateTime<Utc>>,
    pub stock_quantity: i32,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

/// The product as a customer sees it right now
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductView {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Uuid,
    pub subcategory_id: Option<Uuid>,
    pub images: Vec<ProductImage>,
    pub is_vegan: bool,
    pub is_gluten_free: bool,
    pub is_age_restricted: bool,
    pub minimum_age: Option<i32>,
    pub barcode: Option<String>,
    pub franchise_id: Option<Uuid>,
    pub retail_price: Decimal,
    pub promotion_price: Option<Decimal>,
    pub current_price: Decimal,
    pub promotion_active: bool,
    pub stock_quantity: i32,
    pub is_available: bool,
}

/// Catalog list filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductQuery {
    pub franchise_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub q: Option<String>,
}
