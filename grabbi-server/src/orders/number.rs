use chrono::{DateTime, Utc};
use uuid::Uuid;

/// `ORD` + yyyymmddHHMMSS + first 8 hex digits of the order id, uppercase
pub fn order_number(id: Uuid, now: DateTime<Utc>) -> String {
    let simple = id.simple().to_string();
    format!(
        "ORD{}{}",
        now.format("%Y%m%d%H%M%S"),
        simple[..8].to_uppercase()
    )
}
