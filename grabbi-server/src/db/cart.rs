use shared::models::CartItem;
use sqlx::PgExecutor;
use uuid::Uuid;

pub async fn list(conn: impl PgExecutor<'_>, user_id: Uuid) -> Result<Vec<CartItem>, sqlx::Error> {
    sqlx::query_as(
        "SELECT user_id, product_id, franchise_id, quantity FROM cart_items
         WHERE user_id = $1 ORDER BY product_id",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await
}

/// Add `quantity` to the line, creating it if absent
pub async fn add(
    conn: impl PgExecutor<'_>,
    user_id: Uuid,
    product_id: Uuid,
    franchise_id: Option<Uuid>,
    quantity: i32,
) -> Result<CartItem, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO cart_items (user_id, product_id, franchise_id, quantity)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, product_id) DO UPDATE SET
            quantity = cart_items.quantity + EXCLUDED.quantity,
            franchise_id = EXCLUDED.franchise_id
        RETURNING user_id, product_id, franchise_id, quantity
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .bind(franchise_id)
    .bind(quantity)
    .fetch_one(conn)
    .await
}

pub async fn set_quantity(
    conn: impl PgExecutor<'_>,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE cart_items SET quantity = $3 WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .bind(quantity)
            .execute(conn)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn remove(
    conn: impl PgExecutor<'_>,
    user_id: Uuid,
    product_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn clear(conn: impl PgExecutor<'_>, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}
