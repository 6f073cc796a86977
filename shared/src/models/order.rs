//! Order Model
//!
//! [`OrderStatus`] owns the lifecycle graph. Side effects of a transition
//! (stock, loyalty, notifications) live in the server's order service; this
//! module only answers "is this move legal".

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "text", rename_all = "snake_case"))]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Statuses reachable from `self` in one step
    pub fn allowed_transitions(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[Preparing, Cancelled],
            Preparing => &[Ready, Cancelled],
            Ready => &[OutForDelivery, Cancelled],
            OutForDelivery => &[Delivered, Cancelled],
            Delivered | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub franchise_id: Option<Uuid>,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    pub delivery_address: String,
    pub payment_method: String,
    pub loyalty_points_earned: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[cfg_attr(feature = "db", sqlx(skip))]
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

/// Order line with immutable product snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    /// Cleared when the product is removed; the snapshot fields remain
    pub product_id: Option<Uuid>,
    pub product_name_snapshot: String,
    pub product_sku_snapshot: String,
    pub image_url_snapshot: Option<String>,
    pub quantity: i32,
    pub price_snapshot: Decimal,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.price_snapshot * Decimal::from(self.quantity)
    }
}

/// Checkout payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub delivery_address: String,
    pub payment_method: String,
    pub customer_lat: Option<f64>,
    pub customer_lng: Option<f64>,
}

/// Status change payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn test_forward_path() {
        let path = [Pending, Confirmed, Preparing, Ready, OutForDelivery, Delivered];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_every_non_terminal_status_can_cancel() {
        for status in OrderStatus::ALL {
            assert_eq!(status.can_transition_to(Cancelled), !status.is_terminal());
        }
    }

    #[test]
    fn test_terminal_statuses_have_no_exit() {
        for next in OrderStatus::ALL {
            assert!(!Delivered.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }
        assert!(Delivered.is_terminal());
        assert!(Cancelled.is_terminal());
    }

    #[test]
    fn test_rejects_skips_and_backward_moves() {
        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Pending.can_transition_to(Preparing));
        assert!(!Ready.can_transition_to(Confirmed));
        assert!(!OutForDelivery.can_transition_to(Pending));
        for status in OrderStatus::ALL {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_exact_transition_count() {
        let edges: usize = OrderStatus::ALL
            .iter()
            .map(|s| s.allowed_transitions().len())
            .sum();
        assert_eq!(edges, 10);
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(
            serde_json::to_string(&OutForDelivery).unwrap(),
            "\"out_for_delivery\""
        );
        let update: OrderStatusUpdate =
            serde_json::from_str(r#"{"status":"confirmed"}"#).unwrap();
        assert_eq!(update.status, Confirmed);
        assert!(serde_json::from_str::<OrderStatusUpdate>(r#"{"status":"shipped"}"#).is_err());
    }

    #[test]
    fn test_line_total() {
        let item = OrderItem {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            product_id: None,
            product_name_snapshot: "Milk".into(),
            product_sku_snapshot: "MILK".into(),
            image_url_snapshot: None,
            quantity: 3,
            price_snapshot: Decimal::new(199, 2),
        };
        assert_eq!(item.line_total(), Decimal::new(597, 2));
    }
}
