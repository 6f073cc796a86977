//! Loyalty Model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "text", rename_all = "snake_case"))]
pub enum LoyaltyEntryType {
    Earned,
    Redeemed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct LoyaltyHistory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub points: i32,
    #[serde(rename = "type")]
    #[cfg_attr(feature = "db", sqlx(rename = "type"))]
    pub entry_type: LoyaltyEntryType,
    pub order_id: Option<Uuid>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoyaltySummary {
    pub points: i32,
    pub history: Vec<LoyaltyHistory>,
}

/// Points credited for a delivered order: one per whole currency unit
pub fn points_for_total(total: Decimal) -> i32 {
    total.floor().to_i32().unwrap_or(0).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_floor() {
        assert_eq!(points_for_total(Decimal::new(4299, 2)), 42);
        assert_eq!(points_for_total(Decimal::new(100, 2)), 1);
        assert_eq!(points_for_total(Decimal::new(99, 2)), 0);
        assert_eq!(points_for_total(Decimal::ZERO), 0);
    }
}
