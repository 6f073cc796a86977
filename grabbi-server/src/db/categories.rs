use shared::models::Category;
use sqlx::PgExecutor;
use std::collections::HashSet;
use uuid::Uuid;

pub async fn list(conn: impl PgExecutor<'_>) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as("SELECT id, name, slug, parent_id FROM categories ORDER BY name")
        .fetch_all(conn)
        .await
}

pub async fn ids(conn: impl PgExecutor<'_>) -> Result<HashSet<Uuid>, sqlx::Error> {
    let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM categories")
        .fetch_all(conn)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn exists(conn: impl PgExecutor<'_>, id: Uuid) -> Result<bool, sqlx::Error> {
    let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
        .bind(id)
        .fetch_one(conn)
        .await?;
    Ok(exists)
}
