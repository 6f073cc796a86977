use shared::models::{Product, ProductDraft, ProductImage};
use sqlx::{PgConnection, PgExecutor, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

const COLUMNS: &str = "id, sku, name, description, cost_price, retail_price, promotion_price, \
    promotion_start, promotion_end, stock_quantity, reorder_level, category_id, subcategory_id, \
    is_vegan, is_gluten_free, is_age_restricted, minimum_age, status, online_visible, barcode";

/// Public catalog filter; `q` matches name or sku, case-insensitive
pub struct ListFilter<'a> {
    pub category_id: Option<Uuid>,
    pub q: Option<&'a str>,
    /// Only active, online-visible products
    pub public_only: bool,
}

pub async fn find(conn: impl PgExecutor<'_>, id: Uuid) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM products WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub async fn find_by_sku(
    conn: impl PgExecutor<'_>,
    sku: &str,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM products WHERE sku = $1 AND deleted_at IS NULL"
    ))
    .bind(sku)
    .fetch_optional(conn)
    .await
}

/// Product with its images
pub async fn find_full(pool: &PgPool, id: Uuid) -> Result<Option<Product>, sqlx::Error> {
    let Some(mut product) = find(pool, id).await? else {
        return Ok(None);
    };
    product.images = images(pool, id).await?;
    Ok(Some(product))
}

pub async fn list(pool: &PgPool, filter: &ListFilter<'_>) -> Result<Vec<Product>, sqlx::Error> {
    let pattern = filter.q.map(|q| format!("%{}%", q.trim()));
    let mut products: Vec<Product> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM products
         WHERE deleted_at IS NULL
           AND ($1::uuid IS NULL OR category_id = $1 OR subcategory_id = $1)
           AND ($2::text IS NULL OR name ILIKE $2 OR sku ILIKE $2)
           AND (NOT $3 OR (status = 'active' AND online_visible))
         ORDER BY name"
    ))
    .bind(filter.category_id)
    .bind(pattern)
    .bind(filter.public_only)
    .fetch_all(pool)
    .await?;

    attach_images(pool, &mut products).await?;
    Ok(products)
}

pub async fn images(
    conn: impl PgExecutor<'_>,
    product_id: Uuid,
) -> Result<Vec<ProductImage>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, product_id, url, is_primary, sort_order FROM product_images
         WHERE product_id = $1 ORDER BY sort_order",
    )
    .bind(product_id)
    .fetch_all(conn)
    .await
}

/// Fill `images` for every product with one query
pub async fn attach_images(
    conn: impl PgExecutor<'_>,
    products: &mut [Product],
) -> Result<(), sqlx::Error> {
    if products.is_empty() {
        return Ok(());
    }
    let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let rows: Vec<ProductImage> = sqlx::query_as(
        "SELECT id, product_id, url, is_primary, sort_order FROM product_images
         WHERE product_id = ANY($1) ORDER BY product_id, sort_order",
    )
    .bind(&ids)
    .fetch_all(conn)
    .await?;

    let mut by_product: HashMap<Uuid, Vec<ProductImage>> = HashMap::new();
    for img in rows {
        by_product.entry(img.product_id).or_default().push(img);
    }
    for product in products.iter_mut() {
        product.images = by_product.remove(&product.id).unwrap_or_default();
    }
    Ok(())
}

pub async fn insert(
    conn: &mut PgConnection,
    id: Uuid,
    draft: &ProductDraft,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO products (
            id, sku, name, description, cost_price, retail_price, promotion_price,
            promotion_start, promotion_end, stock_quantity, reorder_level, category_id,
            subcategory_id, is_vegan, is_gluten_free, is_age_restricted, minimum_age,
            status, online_visible, barcode
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
        "#,
    )
    .bind(id)
    .bind(&draft.sku)
    .bind(&draft.name)
    .bind(&draft.description)
    .bind(draft.cost_price)
    .bind(draft.retail_price)
    .bind(draft.promotion_price)
    .bind(draft.promotion_start)
    .bind(draft.promotion_end)
    .bind(draft.stock_quantity)
    .bind(draft.reorder_level)
    .bind(draft.category_id)
    .bind(draft.subcategory_id)
    .bind(draft.is_vegan)
    .bind(draft.is_gluten_free)
    .bind(draft.is_age_restricted)
    .bind(draft.minimum_age)
    .bind(draft.status)
    .bind(draft.online_visible)
    .bind(&draft.barcode)
    .execute(conn)
    .await?;
    Ok(())
}

/// Returns false when the product does not exist
pub async fn update(
    conn: &mut PgConnection,
    id: Uuid,
    draft: &ProductDraft,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE products SET
            sku = $2, name = $3, description = $4, cost_price = $5, retail_price = $6,
            promotion_price = $7, promotion_start = $8, promotion_end = $9,
            stock_quantity = $10, reorder_level = $11, category_id = $12,
            subcategory_id = $13, is_vegan = $14, is_gluten_free = $15,
            is_age_restricted = $16, minimum_age = $17, status = $18,
            online_visible = $19, barcode = $20, updated_at = now()
        WHERE id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(id)
    .bind(&draft.sku)
    .bind(&draft.name)
    .bind(&draft.description)
    .bind(draft.cost_price)
    .bind(draft.retail_price)
    .bind(draft.promotion_price)
    .bind(draft.promotion_start)
    .bind(draft.promotion_end)
    .bind(draft.stock_quantity)
    .bind(draft.reorder_level)
    .bind(draft.category_id)
    .bind(draft.subcategory_id)
    .bind(draft.is_vegan)
    .bind(draft.is_gluten_free)
    .bind(draft.is_age_restricted)
    .bind(draft.minimum_age)
    .bind(draft.status)
    .bind(draft.online_visible)
    .bind(&draft.barcode)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM products WHERE id = $1 AND deleted_at IS NULL FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?;
    Ok(row.is_some())
}

/// Number of order lines pointing at the product
pub async fn order_references(
    conn: impl PgExecutor<'_>,
    product_id: Uuid,
) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM order_items WHERE product_id = $1")
            .bind(product_id)
            .fetch_one(conn)
            .await?;
    Ok(count)
}

/// Hard delete; images and franchise overlays cascade
pub async fn delete(conn: impl PgExecutor<'_>, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Replace the image list, first URL primary; returns the previous URLs
pub async fn replace_images(
    conn: &mut PgConnection,
    product_id: Uuid,
    urls: &[String],
) -> Result<Vec<String>, sqlx::Error> {
    let previous: Vec<(String,)> =
        sqlx::query_as("DELETE FROM product_images WHERE product_id = $1 RETURNING url")
            .bind(product_id)
            .fetch_all(&mut *conn)
            .await?;

    for (i, url) in urls.iter().enumerate() {
        sqlx::query(
            "INSERT INTO product_images (id, product_id, url, is_primary, sort_order)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(product_id)
        .bind(url)
        .bind(i == 0)
        .bind(i as i32)
        .execute(&mut *conn)
        .await?;
    }

    Ok(previous.into_iter().map(|(url,)| url).collect())
}

/// True if any order line snapshot still shows this image
pub async fn image_referenced(conn: impl PgExecutor<'_>, url: &str) -> Result<bool, sqlx::Error> {
    let (exists,): (bool,) =
        sqlx::query_as("SELECT EXISTS (SELECT 1 FROM order_items WHERE image_url_snapshot = $1)")
            .bind(url)
            .fetch_one(conn)
            .await?;
    Ok(exists)
}

/// (id, sku) of every live product
pub async fn keys(conn: impl PgExecutor<'_>) -> Result<Vec<(Uuid, String)>, sqlx::Error> {
    sqlx::query_as("SELECT id, sku FROM products WHERE deleted_at IS NULL")
        .fetch_all(conn)
        .await
}

/// Take `qty` from global stock; false if not enough
pub async fn decrement_stock(
    conn: &mut PgConnection,
    id: Uuid,
    qty: i32,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = now()
         WHERE id = $1 AND stock_quantity >= $2",
    )
    .bind(id)
    .bind(qty)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn restore_stock(
    conn: &mut PgConnection,
    id: Uuid,
    qty: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE products SET stock_quantity = stock_quantity + $2, updated_at = now() WHERE id = $1",
    )
    .bind(id)
    .bind(qty)
    .execute(conn)
    .await?;
    Ok(())
}
