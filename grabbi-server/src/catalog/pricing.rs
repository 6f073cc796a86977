//! Effective price resolution
//!
//! Franchise overrides are layered field by field over the global product.
//! A promotion needs a price and at least one window bound to be active.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::models::{FranchiseProduct, Product, ProductStatus, ProductView};

/// Price and promotion fields after overlaying a franchise row
#[derive(Debug, Clone, PartialEq)]
pub struct EffectivePricing {
    pub retail_price: Decimal,
    pub promotion_price: Option<Decimal>,
    pub promotion_start: Option<DateTime<Utc>>,
    pub promotion_end: Option<DateTime<Utc>>,
}

impl EffectivePricing {
    pub fn resolve(product: &Product, overlay: Option<&FranchiseProduct>) -> Self {
        match overlay {
            Some(o) => Self {
                retail_price: o.retail_price_override.unwrap_or(product.retail_price),
                promotion_price: o.promotion_price_override.or(product.promotion_price),
                promotion_start: o.promotion_start_override.or(product.promotion_start),
                promotion_end: o.promotion_end_override.or(product.promotion_end),
            },
            None => Self {
                retail_price: product.retail_price,
                promotion_price: product.promotion_price,
                promotion_start: product.promotion_start,
                promotion_end: product.promotion_end,
            },
        }
    }

    pub fn promotion_active(&self, now: DateTime<Utc>) -> bool {
        is_promotion_active(
            self.promotion_price,
            self.promotion_start,
            self.promotion_end,
            now,
        )
    }

    pub fn current_price(&self, now: DateTime<Utc>) -> Decimal {
        match self.promotion_price {
            Some(promo) if self.promotion_active(now) => promo,
            _ => self.retail_price,
        }
    }
}

pub fn is_promotion_active(
    price: Option<Decimal>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    if price.is_none() || (start.is_none() && end.is_none()) {
        return false;
    }
    start.is_none_or(|s| now >= s) && end.is_none_or(|e| now <= e)
}

/// Whether the product can be ordered, and the stock that backs it
///
/// With a franchise in scope only the overlay counts; a missing overlay
/// means the franchise does not carry the product.
pub fn availability(
    product: &Product,
    franchise_scoped: bool,
    overlay: Option<&FranchiseProduct>,
) -> (bool, i32) {
    if franchise_scoped {
        return match overlay {
            Some(o) => (o.is_available && o.stock_quantity > 0, o.stock_quantity),
            None => (false, 0),
        };
    }
    let available = product.status == ProductStatus::Active
        && product.online_visible
        && product.stock_quantity > 0;
    (available, product.stock_quantity)
}

/// Build the customer-facing view of a product at `now`
pub fn product_view(
    product: &Product,
    franchise_id: Option<uuid::Uuid>,
    overlay: Option<&FranchiseProduct>,
    now: DateTime<Utc>,
) -> ProductView {
    let pricing = EffectivePricing::resolve(product, overlay);
    let (is_available, stock_quantity) = availability(product, franchise_id.is_some(), overlay);
    let promotion_active = pricing.promotion_active(now);

    ProductView {
        id: product.id,
        sku: product.sku.clone(),
        name: product.name.clone(),
        description: product.description.clone(),
        category_id: product.category_id,
        subcategory_id: product.subcategory_id,
        images: product.images.clone(),
        is_vegan: product.is_vegan,
        is_gluten_free: product.is_gluten_free,
        is_age_restricted: product.is_age_restricted,
        minimum_age: product.minimum_age,
        barcode: product.barcode.clone(),
        franchise_id,
        retail_price: pricing.retail_price,
        promotion_price: pricing.promotion_price,
        current_price: pricing.current_price(now),
        promotion_active,
        stock_quantity,
        is_available,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    pub(crate) fn product(retail: i64) -> Product {
        Product {
            id: Uuid::new_v4(),
            sku: "SKU-1".into(),
            name: "Sourdough".into(),
            description: None,
            cost_price: Decimal::new(100, 2),
            retail_price: Decimal::new(retail, 2),
            promotion_price: None,
            promotion_start: None,
            promotion_end: None,
            stock_quantity: 10,
            reorder_level: 0,
            category_id: Uuid::new_v4(),
            subcategory_id: None,
            is_vegan: false,
            is_gluten_free: false,
            is_age_restricted: false,
            minimum_age: None,
            status: ProductStatus::Active,
            online_visible: true,
            barcode: None,
            images: Vec::new(),
        }
    }

    pub(crate) fn overlay(product_id: Uuid, franchise_id: Uuid, stock: i32) -> FranchiseProduct {
        FranchiseProduct {
            franchise_id,
            product_id,
            retail_price_override: None,
            promotion_price_override: None,
            promotion_start_override: None,
            promotion_end_override: None,
            stock_quantity: stock,
            is_available: true,
        }
    }

    #[test]
    fn test_promotion_without_window_is_inactive() {
        let now = Utc::now();
        assert!(!is_promotion_active(Some(Decimal::ONE), None, None, now));
    }

    #[test]
    fn test_promotion_window_bounds_inclusive() {
        let now = Utc::now();
        let p = Some(Decimal::ONE);
        assert!(is_promotion_active(p, Some(now), None, now));
        assert!(is_promotion_active(p, None, Some(now), now));
        assert!(!is_promotion_active(p, Some(now + Duration::seconds(1)), None, now));
        assert!(!is_promotion_active(p, None, Some(now - Duration::seconds(1)), now));
        assert!(!is_promotion_active(None, Some(now - Duration::days(1)), None, now));
    }

    #[test]
    fn test_global_price_without_overlay() {
        let now = Utc::now();
        let mut p = product(500);
        p.promotion_price = Some(Decimal::new(399, 2));
        p.promotion_start = Some(now - Duration::hours(1));
        p.promotion_end = Some(now + Duration::hours(1));

        let view = product_view(&p, None, None, now);
        assert!(view.promotion_active);
        assert_eq!(view.current_price, Decimal::new(399, 2));
        assert_eq!(view.retail_price, Decimal::new(500, 2));
        assert!(view.is_available);
    }

    #[test]
    fn test_overlay_fields_win_individually() {
        let now = Utc::now();
        let franchise = Uuid::new_v4();
        let mut p = product(500);
        p.promotion_price = Some(Decimal::new(450, 2));
        p.promotion_end = Some(now - Duration::days(1)); // expired globally

        let mut o = overlay(p.id, franchise, 3);
        o.retail_price_override = Some(Decimal::new(550, 2));
        o.promotion_end_override = Some(now + Duration::days(1));

        let view = product_view(&p, Some(franchise), Some(&o), now);
        assert_eq!(view.retail_price, Decimal::new(550, 2));
        // global promo price, franchise window
        assert!(view.promotion_active);
        assert_eq!(view.current_price, Decimal::new(450, 2));
        assert_eq!(view.stock_quantity, 3);
        assert_eq!(view.franchise_id, Some(franchise));
    }

    #[test]
    fn test_franchise_availability_requires_overlay_and_stock() {
        let franchise = Uuid::new_v4();
        let p = product(500);

        assert_eq!(availability(&p, true, None), (false, 0));

        let mut o = overlay(p.id, franchise, 0);
        assert!(!availability(&p, true, Some(&o)).0);
        o.stock_quantity = 2;
        assert!(availability(&p, true, Some(&o)).0);
        o.is_available = false;
        assert!(!availability(&p, true, Some(&o)).0);
    }

    #[test]
    fn test_global_availability_rules() {
        let mut p = product(500);
        assert!(availability(&p, false, None).0);
        p.online_visible = false;
        assert!(!availability(&p, false, None).0);
        p.online_visible = true;
        p.status = ProductStatus::Inactive;
        assert!(!availability(&p, false, None).0);
        p.status = ProductStatus::Active;
        p.stock_quantity = 0;
        assert!(!availability(&p, false, None).0);
    }
}
