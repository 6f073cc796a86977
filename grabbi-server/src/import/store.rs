//! Persistence seam of the import engine

use async_trait::async_trait;
use shared::models::{Product, ProductDraft};
use sqlx::PgPool;
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

use crate::db;

#[derive(Error, Debug)]
pub enum StoreError {
    /// The row cannot be written; the job carries on
    #[error("{field}: {message}")]
    Row { field: String, message: String },

    /// The store itself failed; the job stops
    #[error("catalog store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn row(field: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Row {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(constraint) = crate::error::unique_violation(&err) {
            return match constraint {
                "products_sku_key" => StoreError::row("sku", "sku already exists"),
                "products_barcode_key" => StoreError::row("barcode", "barcode already exists"),
                other => StoreError::row("product", format!("duplicate value ({other})")),
            };
        }
        if let sqlx::Error::Database(db) = &err {
            match db.code().as_deref() {
                Some("23503") => {
                    return StoreError::row("category_id", "references a missing record");
                }
                Some("23514") => {
                    return StoreError::row("product", "violates a product constraint");
                }
                _ => {}
            }
        }
        StoreError::Unavailable(err.to_string())
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn category_ids(&self) -> Result<HashSet<Uuid>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError>;

    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, StoreError>;

    async fn create(&self, id: Uuid, draft: &ProductDraft) -> Result<(), StoreError>;

    async fn update(&self, id: Uuid, draft: &ProductDraft) -> Result<(), StoreError>;

    /// Number of order lines referencing the product
    async fn order_references(&self, id: Uuid) -> Result<i64, StoreError>;

    /// Hard delete; returns the URLs of the removed product's images
    async fn delete(&self, id: Uuid) -> Result<Vec<String>, StoreError>;

    /// Replace the image list; returns the previous URLs
    async fn replace_images(&self, id: Uuid, urls: &[String]) -> Result<Vec<String>, StoreError>;

    async fn image_referenced(&self, url: &str) -> Result<bool, StoreError>;

    /// (id, sku) of every live product
    async fn product_keys(&self) -> Result<Vec<(Uuid, String)>, StoreError>;

    async fn upsert_franchise_stock(
        &self,
        franchise_id: Uuid,
        product_id: Uuid,
        stock_quantity: i32,
        is_available: bool,
    ) -> Result<(), StoreError>;

    /// (id, sku) of every product the franchise stocks
    async fn franchise_keys(&self, franchise_id: Uuid) -> Result<Vec<(Uuid, String)>, StoreError>;

    async fn remove_from_franchise(
        &self,
        franchise_id: Uuid,
        product_id: Uuid,
    ) -> Result<bool, StoreError>;
}

pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn category_ids(&self) -> Result<HashSet<Uuid>, StoreError> {
        Ok(db::categories::ids(&self.pool).await?)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        Ok(db::products::find_full(&self.pool, id).await?)
    }

    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, StoreError> {
        let Some(mut product) = db::products::find_by_sku(&self.pool, sku).await? else {
            return Ok(None);
        };
        product.images = db::products::images(&self.pool, product.id).await?;
        Ok(Some(product))
    }

    async fn create(&self, id: Uuid, draft: &ProductDraft) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        db::products::insert(&mut conn, id, draft).await?;
        Ok(())
    }

    async fn update(&self, id: Uuid, draft: &ProductDraft) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        if db::products::update(&mut conn, id, draft).await? {
            Ok(())
        } else {
            Err(StoreError::row("id", "product not found"))
        }
    }

    async fn order_references(&self, id: Uuid) -> Result<i64, StoreError> {
        Ok(db::products::order_references(&self.pool, id).await?)
    }

    async fn delete(&self, id: Uuid) -> Result<Vec<String>, StoreError> {
        let mut tx = self.pool.begin().await?;
        // holding the row lock blocks new order lines until the delete commits
        if !db::products::lock(&mut tx, id).await? {
            return Err(StoreError::row("id", "product not found"));
        }
        let refs = db::products::order_references(&mut *tx, id).await?;
        if refs > 0 {
            return Err(StoreError::row(
                "product_id",
                format!("referenced by {refs} orders"),
            ));
        }
        let images = db::products::images(&mut *tx, id).await?;
        db::products::delete(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(images.into_iter().map(|img| img.url).collect())
    }

    async fn replace_images(&self, id: Uuid, urls: &[String]) -> Result<Vec<String>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let previous = db::products::replace_images(&mut tx, id, urls).await?;
        tx.commit().await?;
        Ok(previous)
    }

    async fn image_referenced(&self, url: &str) -> Result<bool, StoreError> {
        Ok(db::products::image_referenced(&self.pool, url).await?)
    }

    async fn product_keys(&self) -> Result<Vec<(Uuid, String)>, StoreError> {
        Ok(db::products::keys(&self.pool).await?)
    }

    async fn upsert_franchise_stock(
        &self,
        franchise_id: Uuid,
        product_id: Uuid,
        stock_quantity: i32,
        is_available: bool,
    ) -> Result<(), StoreError> {
        db::franchise_products::upsert_stock(
            &self.pool,
            franchise_id,
            product_id,
            stock_quantity,
            is_available,
        )
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::Row { .. } => StoreError::row("franchise_ids", "unknown franchise"),
            fatal => fatal,
        })
    }

    async fn franchise_keys(&self, franchise_id: Uuid) -> Result<Vec<(Uuid, String)>, StoreError> {
        Ok(db::franchise_products::keys(&self.pool, franchise_id).await?)
    }

    async fn remove_from_franchise(
        &self,
        franchise_id: Uuid,
        product_id: Uuid,
    ) -> Result<bool, StoreError> {
        Ok(db::franchise_products::delete(&self.pool, franchise_id, product_id).await?)
    }
}
