//! Data models
//!
//! Shared between the server crate and its tests.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are UUID v4 assigned before persistence.

pub mod cart;
pub mod franchise;
pub mod job;
pub mod loyalty;
pub mod order;
pub mod product;
pub mod user;

// Re-exports
pub use cart::*;
pub use franchise::*;
pub use job::*;
pub use loyalty::*;
pub use order::*;
pub use product::*;
pub use user::*;
