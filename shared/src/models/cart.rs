//! Cart Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::product::ProductView;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CartItem {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub franchise_id: Option<Uuid>,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartAdd {
    pub product_id: Uuid,
    pub quantity: i32,
    pub franchise_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartQuantity {
    pub quantity: i32,
}

/// Cart line resolved against the current catalog
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub product: ProductView,
    pub quantity: i32,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub subtotal: Decimal,
}

impl CartView {
    pub fn from_lines(items: Vec<CartLine>) -> Self {
        let subtotal = items.iter().map(|l| l.line_total).sum();
        Self { items, subtotal }
    }
}
