use shared::models::{NewUser, Role, User};
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

const COLUMNS: &str = "id, email, password_hash, name, phone, role, franchise_id, \
    loyalty_points, is_blocked, created_at, updated_at";

pub async fn find(conn: impl PgExecutor<'_>, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
}

/// `email` must already be normalized
pub async fn find_by_email(
    conn: impl PgExecutor<'_>,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL"
    ))
    .bind(email)
    .fetch_optional(conn)
    .await
}

pub async fn insert(conn: impl PgExecutor<'_>, user: &NewUser) -> Result<User, sqlx::Error> {
    sqlx::query_as(&format!(
        "INSERT INTO users (id, email, password_hash, name, phone, role, franchise_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {COLUMNS}"
    ))
    .bind(user.id)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.name)
    .bind(&user.phone)
    .bind(user.role)
    .bind(user.franchise_id)
    .fetch_one(conn)
    .await
}

/// Row lock serializing per-user mutations (cart, loyalty)
pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE id = $1 AND deleted_at IS NULL FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?;
    Ok(row.is_some())
}

pub async fn set_blocked(
    conn: impl PgExecutor<'_>,
    id: Uuid,
    blocked: bool,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(&format!(
        "UPDATE users SET is_blocked = $2, updated_at = now()
         WHERE id = $1 AND deleted_at IS NULL
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(blocked)
    .fetch_optional(conn)
    .await
}

pub async fn set_password(
    conn: impl PgExecutor<'_>,
    id: Uuid,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(conn)
        .await?;
    Ok(())
}

/// Make the user owner or staff of a franchise
pub async fn assign_franchise(
    conn: impl PgExecutor<'_>,
    id: Uuid,
    role: Role,
    franchise_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET role = $2, franchise_id = $3, updated_at = now()
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(role)
    .bind(franchise_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Add `delta` points, never going below zero; returns the new balance
pub async fn add_loyalty_points(
    conn: impl PgExecutor<'_>,
    id: Uuid,
    delta: i32,
) -> Result<i32, sqlx::Error> {
    let (points,): (i32,) = sqlx::query_as(
        "UPDATE users SET loyalty_points = GREATEST(0, loyalty_points + $2), updated_at = now()
         WHERE id = $1
         RETURNING loyalty_points",
    )
    .bind(id)
    .bind(delta)
    .fetch_one(conn)
    .await?;
    Ok(points)
}
