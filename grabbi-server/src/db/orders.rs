use shared::models::{Order, OrderItem, OrderStatus};
use sqlx::{PgConnection, PgExecutor, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

const COLUMNS: &str = "id, order_number, user_id, franchise_id, status, subtotal, delivery_fee, \
    total, delivery_address, payment_method, loyalty_points_earned, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, product_name_snapshot, \
    product_sku_snapshot, image_url_snapshot, quantity, price_snapshot";

/// Whose orders a listing returns
#[derive(Debug, Clone, Copy)]
pub enum OrderScope {
    User(Uuid),
    Franchise(Uuid),
    All,
}

pub async fn insert(conn: &mut PgConnection, order: &Order) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO orders (
            id, order_number, user_id, franchise_id, status, subtotal, delivery_fee, total,
            delivery_address, payment_method, loyalty_points_earned, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(order.id)
    .bind(&order.order_number)
    .bind(order.user_id)
    .bind(order.franchise_id)
    .bind(order.status)
    .bind(order.subtotal)
    .bind(order.delivery_fee)
    .bind(order.total)
    .bind(&order.delivery_address)
    .bind(&order.payment_method)
    .bind(order.loyalty_points_earned)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    for item in &order.items {
        sqlx::query(&format!(
            "INSERT INTO order_items ({ITEM_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(item.id)
        .bind(item.order_id)
        .bind(item.product_id)
        .bind(&item.product_name_snapshot)
        .bind(&item.product_sku_snapshot)
        .bind(&item.image_url_snapshot)
        .bind(item.quantity)
        .bind(item.price_snapshot)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn items(
    conn: impl PgExecutor<'_>,
    order_id: Uuid,
) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY product_name_snapshot"
    ))
    .bind(order_id)
    .fetch_all(conn)
    .await
}

/// Order with items
pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> =
        sqlx::query_as(&format!("SELECT {COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
    let Some(mut order) = order else {
        return Ok(None);
    };
    order.items = items(pool, id).await?;
    Ok(Some(order))
}

/// Lock the order row for a status transition; items included
pub async fn find_for_update(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> =
        sqlx::query_as(&format!("SELECT {COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    let Some(mut order) = order else {
        return Ok(None);
    };
    order.items = items(&mut *conn, id).await?;
    Ok(Some(order))
}

pub async fn list(pool: &PgPool, scope: OrderScope) -> Result<Vec<Order>, sqlx::Error> {
    let (filter, id) = match scope {
        OrderScope::User(id) => ("WHERE user_id = $1", Some(id)),
        OrderScope::Franchise(id) => ("WHERE franchise_id = $1", Some(id)),
        OrderScope::All => ("WHERE $1::uuid IS NULL", None),
    };
    let mut orders: Vec<Order> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM orders {filter} ORDER BY created_at DESC"
    ))
    .bind(id)
    .fetch_all(pool)
    .await?;

    if orders.is_empty() {
        return Ok(orders);
    }
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let rows: Vec<OrderItem> = sqlx::query_as(&format!(
        "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1)
         ORDER BY product_name_snapshot"
    ))
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in rows {
        by_order.entry(item.order_id).or_default().push(item);
    }
    for order in &mut orders {
        order.items = by_order.remove(&order.id).unwrap_or_default();
    }
    Ok(orders)
}

/// Status write; snapshot columns on order_items are never touched here
pub async fn update_status(
    conn: impl PgExecutor<'_>,
    id: Uuid,
    status: OrderStatus,
    loyalty_points_earned: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE orders SET status = $2, loyalty_points_earned = $3, updated_at = now()
         WHERE id = $1",
    )
    .bind(id)
    .bind(status)
    .bind(loyalty_points_earned)
    .execute(conn)
    .await?;
    Ok(())
}
