//! Franchise Model

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Franchise entity: a geographically scoped storefront
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Franchise {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub owner_id: Uuid,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub delivery_radius_km: f64,
    pub delivery_fee: Decimal,
    pub free_delivery_min: Option<Decimal>,
    pub is_active: bool,
}

/// Opening hours of one weekday (0 = Sunday)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct StoreHours {
    pub franchise_id: Uuid,
    pub day_of_week: i16,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
    pub is_closed: bool,
}

/// Create franchise payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FranchiseCreate {
    pub name: String,
    pub slug: String,
    pub owner_id: Uuid,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub delivery_radius_km: f64,
    pub delivery_fee: Decimal,
    pub free_delivery_min: Option<Decimal>,
}

/// One row of a weekly hours replacement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreHoursInput {
    pub day_of_week: i16,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
    #[serde(default)]
    pub is_closed: bool,
}

/// Franchise with its distance from a customer, used by nearby search
#[derive(Debug, Clone, Serialize)]
pub struct NearbyFranchise {
    #[serde(flatten)]
    pub franchise: Franchise,
    pub distance_km: f64,
}

/// Seven default rows created with a new franchise: open 08:00 to 22:00 daily
pub fn default_week(franchise_id: Uuid) -> Vec<StoreHours> {
    let open = NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN);
    let close = NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN);
    (0..7)
        .map(|day| StoreHours {
            franchise_id,
            day_of_week: day,
            open_time: open,
            close_time: close,
            is_closed: false,
        })
        .collect()
}

/// A replacement week must name every day 0..=6 exactly once
pub fn validate_week(rows: &[StoreHoursInput]) -> Result<(), String> {
    if rows.len() != 7 {
        return Err(format!("hours must contain 7 rows, got {}", rows.len()));
    }
    let mut seen = [false; 7];
    for row in rows {
        let day = usize::try_from(row.day_of_week)
            .ok()
            .filter(|d| *d < 7)
            .ok_or_else(|| format!("day_of_week {} is out of range", row.day_of_week))?;
        if seen[day] {
            return Err(format!("day_of_week {} appears twice", day));
        }
        seen[day] = true;
    }
    Ok(())
}
