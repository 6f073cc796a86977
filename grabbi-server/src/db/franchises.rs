use shared::models::{Franchise, FranchiseCreate, StoreHours, StoreHoursInput};
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

const COLUMNS: &str = "id, name, slug, owner_id, address, latitude, longitude, \
    delivery_radius_km, delivery_fee, free_delivery_min, is_active";

pub async fn find(conn: impl PgExecutor<'_>, id: Uuid) -> Result<Option<Franchise>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM franchises WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub async fn list_active(conn: impl PgExecutor<'_>) -> Result<Vec<Franchise>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM franchises WHERE is_active AND deleted_at IS NULL ORDER BY name"
    ))
    .fetch_all(conn)
    .await
}

pub async fn insert(
    conn: impl PgExecutor<'_>,
    id: Uuid,
    input: &FranchiseCreate,
) -> Result<Franchise, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        INSERT INTO franchises (
            id, name, slug, owner_id, address, latitude, longitude,
            delivery_radius_km, delivery_fee, free_delivery_min
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(input.name.trim())
    .bind(input.slug.trim())
    .bind(input.owner_id)
    .bind(&input.address)
    .bind(input.latitude)
    .bind(input.longitude)
    .bind(input.delivery_radius_km)
    .bind(input.delivery_fee)
    .bind(input.free_delivery_min)
    .fetch_one(conn)
    .await
}

pub async fn hours(
    conn: impl PgExecutor<'_>,
    franchise_id: Uuid,
) -> Result<Vec<StoreHours>, sqlx::Error> {
    sqlx::query_as(
        "SELECT franchise_id, day_of_week, open_time, close_time, is_closed
         FROM store_hours WHERE franchise_id = $1 ORDER BY day_of_week",
    )
    .bind(franchise_id)
    .fetch_all(conn)
    .await
}

pub async fn insert_hours(conn: &mut PgConnection, rows: &[StoreHours]) -> Result<(), sqlx::Error> {
    for row in rows {
        sqlx::query(
            "INSERT INTO store_hours (franchise_id, day_of_week, open_time, close_time, is_closed)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(row.franchise_id)
        .bind(row.day_of_week)
        .bind(row.open_time)
        .bind(row.close_time)
        .bind(row.is_closed)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Replace the whole week; the caller validates the seven rows
pub async fn replace_hours(
    conn: &mut PgConnection,
    franchise_id: Uuid,
    rows: &[StoreHoursInput],
) -> Result<Vec<StoreHours>, sqlx::Error> {
    sqlx::query("DELETE FROM store_hours WHERE franchise_id = $1")
        .bind(franchise_id)
        .execute(&mut *conn)
        .await?;

    let week: Vec<StoreHours> = rows
        .iter()
        .map(|r| StoreHours {
            franchise_id,
            day_of_week: r.day_of_week,
            open_time: r.open_time,
            close_time: r.close_time,
            is_closed: r.is_closed,
        })
        .collect();
    insert_hours(conn, &week).await?;

    let mut week = week;
    week.sort_by_key(|h| h.day_of_week);
    Ok(week)
}
