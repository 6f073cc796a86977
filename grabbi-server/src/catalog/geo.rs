//! Distance and delivery fee

use rust_decimal::Decimal;
use shared::models::{Franchise, NearbyFranchise};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Active franchises delivering to (lat, lng), nearest first
pub fn candidates(franchises: Vec<Franchise>, lat: f64, lng: f64) -> Vec<NearbyFranchise> {
    let mut nearby: Vec<NearbyFranchise> = franchises
        .into_iter()
        .filter(|f| f.is_active)
        .map(|f| {
            let distance_km = haversine_km(lat, lng, f.latitude, f.longitude);
            NearbyFranchise {
                franchise: f,
                distance_km,
            }
        })
        .filter(|n| n.distance_km <= n.franchise.delivery_radius_km)
        .collect();
    nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    nearby
}

pub fn delivery_fee(subtotal: Decimal, fee: Decimal, free_delivery_min: Option<Decimal>) -> Decimal {
    match free_delivery_min {
        Some(min) if min <= subtotal => Decimal::ZERO,
        _ => fee,
    }
}
