use shared::models::{FranchiseProduct, FranchiseProductUpdate};
use sqlx::{PgConnection, PgExecutor};
use std::collections::HashMap;
use uuid::Uuid;

const COLUMNS: &str = "franchise_id, product_id, retail_price_override, promotion_price_override, \
    promotion_start_override, promotion_end_override, stock_quantity, is_available";

pub async fn find(
    conn: impl PgExecutor<'_>,
    franchise_id: Uuid,
    product_id: Uuid,
) -> Result<Option<FranchiseProduct>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM franchise_products WHERE franchise_id = $1 AND product_id = $2"
    ))
    .bind(franchise_id)
    .bind(product_id)
    .fetch_optional(conn)
    .await
}

/// Overlay rows of one franchise, keyed by product
pub async fn by_product(
    conn: impl PgExecutor<'_>,
    franchise_id: Uuid,
) -> Result<HashMap<Uuid, FranchiseProduct>, sqlx::Error> {
    let rows: Vec<FranchiseProduct> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM franchise_products WHERE franchise_id = $1"
    ))
    .bind(franchise_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(|r| (r.product_id, r)).collect())
}

/// Full override write from the franchise endpoint
pub async fn upsert(
    conn: impl PgExecutor<'_>,
    franchise_id: Uuid,
    product_id: Uuid,
    update: &FranchiseProductUpdate,
) -> Result<FranchiseProduct, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        INSERT INTO franchise_products ({COLUMNS})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (franchise_id, product_id) DO UPDATE SET
            retail_price_override = EXCLUDED.retail_price_override,
            promotion_price_override = EXCLUDED.promotion_price_override,
            promotion_start_override = EXCLUDED.promotion_start_override,
            promotion_end_override = EXCLUDED.promotion_end_override,
            stock_quantity = EXCLUDED.stock_quantity,
            is_available = EXCLUDED.is_available
        RETURNING {COLUMNS}
        "#
    ))
    .bind(franchise_id)
    .bind(product_id)
    .bind(update.retail_price_override)
    .bind(update.promotion_price_override)
    .bind(update.promotion_start_override)
    .bind(update.promotion_end_override)
    .bind(update.stock_quantity)
    .bind(update.is_available)
    .fetch_one(conn)
    .await
}

/// Import write: stock and availability only, existing overrides kept
pub async fn upsert_stock(
    conn: impl PgExecutor<'_>,
    franchise_id: Uuid,
    product_id: Uuid,
    stock_quantity: i32,
    is_available: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO franchise_products (franchise_id, product_id, stock_quantity, is_available)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (franchise_id, product_id) DO UPDATE SET
            stock_quantity = EXCLUDED.stock_quantity,
            is_available = EXCLUDED.is_available
        "#,
    )
    .bind(franchise_id)
    .bind(product_id)
    .bind(stock_quantity)
    .bind(is_available)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete(
    conn: impl PgExecutor<'_>,
    franchise_id: Uuid,
    product_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM franchise_products WHERE franchise_id = $1 AND product_id = $2")
            .bind(franchise_id)
            .bind(product_id)
            .execute(conn)
            .await?;
    Ok(result.rows_affected() > 0)
}

/// (product id, sku) of every product stocked by the franchise
pub async fn keys(
    conn: impl PgExecutor<'_>,
    franchise_id: Uuid,
) -> Result<Vec<(Uuid, String)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT p.id, p.sku FROM franchise_products fp
         JOIN products p ON p.id = fp.product_id
         WHERE fp.franchise_id = $1 AND p.deleted_at IS NULL",
    )
    .bind(franchise_id)
    .fetch_all(conn)
    .await
}

/// Take `qty` from franchise stock; false if not enough or unavailable
pub async fn decrement_stock(
    conn: &mut PgConnection,
    franchise_id: Uuid,
    product_id: Uuid,
    qty: i32,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE franchise_products SET stock_quantity = stock_quantity - $3
         WHERE franchise_id = $1 AND product_id = $2 AND is_available AND stock_quantity >= $3",
    )
    .bind(franchise_id)
    .bind(product_id)
    .bind(qty)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn restore_stock(
    conn: &mut PgConnection,
    franchise_id: Uuid,
    product_id: Uuid,
    qty: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE franchise_products SET stock_quantity = stock_quantity + $3
         WHERE franchise_id = $1 AND product_id = $2",
    )
    .bind(franchise_id)
    .bind(product_id)
    .bind(qty)
    .execute(conn)
    .await?;
    Ok(())
}
