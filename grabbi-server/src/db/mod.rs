//! PostgreSQL access
//!
//! Free functions over `PgExecutor` / `PgConnection`; callers own the
//! transaction. Reads of users, franchises and products skip soft-deleted rows.

pub mod cart;
pub mod categories;
pub mod franchise_products;
pub mod franchises;
pub mod loyalty;
pub mod orders;
pub mod password_resets;
pub mod products;
pub mod users;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
