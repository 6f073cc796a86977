//! Order checkout and lifecycle
//!
//! The legal moves live on `shared::models::OrderStatus`; this module applies
//! their side effects (stock, loyalty, notifications).

pub mod number;
pub mod service;

pub use service::{create_order, ensure_can_view, transition};
