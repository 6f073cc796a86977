use shared::models::LoyaltyHistory;
use sqlx::PgExecutor;
use uuid::Uuid;

pub async fn insert(conn: impl PgExecutor<'_>, entry: &LoyaltyHistory) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO loyalty_history (id, user_id, points, type, order_id, description, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(entry.id)
    .bind(entry.user_id)
    .bind(entry.points)
    .bind(entry.entry_type)
    .bind(entry.order_id)
    .bind(&entry.description)
    .bind(entry.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn history(
    conn: impl PgExecutor<'_>,
    user_id: Uuid,
) -> Result<Vec<LoyaltyHistory>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, user_id, points, type, order_id, description, created_at
         FROM loyalty_history WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await
}
