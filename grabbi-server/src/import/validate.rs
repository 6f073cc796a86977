//! Product row validation
//!
//! Shared by batch import and the admin product endpoints. Messages name the
//! request field, never internal types.

use rust_decimal::Decimal;
use shared::models::{ProductDraft, ProductImportItem, ProductInput, ProductStatus};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

pub type FieldErrors = BTreeMap<String, String>;

fn min_price() -> Decimal {
    Decimal::new(1, 2)
}

/// Validate one import row against the known category ids
///
/// The returned draft's `sku` is the trimmed request sku, or empty when the
/// row has none; the engine fills it in once the target product is known.
pub fn validate_item(
    item: &ProductImportItem,
    categories: &HashSet<Uuid>,
) -> Result<ProductDraft, FieldErrors> {
    let mut errors = FieldErrors::new();

    let name = item.item_name.trim();
    if name.is_empty() {
        errors.insert("item_name".into(), "item_name is required".into());
    }

    match item.category_id {
        None => {
            errors.insert("category_id".into(), "category_id is required".into());
        }
        Some(id) if !categories.contains(&id) => {
            errors.insert(
                "category_id".into(),
                "category_id does not match a known category".into(),
            );
        }
        Some(_) => {}
    }
    if let Some(sub) = item.subcategory_id
        && !categories.contains(&sub)
    {
        errors.insert(
            "subcategory_id".into(),
            "subcategory_id does not match a known category".into(),
        );
    }

    let draft = ProductDraft {
        sku: item
            .sku
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
        name: name.to_string(),
        description: shared::util::non_blank(item.description.as_deref()),
        cost_price: item.cost_price,
        retail_price: item.retail_price,
        promotion_price: item.promotion_price,
        promotion_start: item.promotion_start,
        promotion_end: item.promotion_end,
        stock_quantity: item.stock_quantity,
        reorder_level: item.reorder_level,
        category_id: item.category_id.unwrap_or_default(),
        subcategory_id: item.subcategory_id,
        is_vegan: item.is_vegan.unwrap_or(false),
        is_gluten_free: item.is_gluten_free.unwrap_or(false),
        is_age_restricted: item.is_age_restricted.unwrap_or(false),
        minimum_age: item.minimum_age,
        status: item.status.unwrap_or(ProductStatus::Active),
        online_visible: item.online_visible.unwrap_or(true),
        barcode: shared::util::non_blank(item.barcode.as_deref()),
    };

    check_draft(&draft, &mut errors);
    if errors.is_empty() {
        Ok(draft)
    } else {
        Err(errors)
    }
}

/// Validate an admin payload; `sku` must already be resolved
pub fn validate_input(input: &ProductInput, sku: String) -> Result<ProductDraft, FieldErrors> {
    let mut errors = FieldErrors::new();
    let name = input.name.trim();
    if name.is_empty() {
        errors.insert("name".into(), "name is required".into());
    }
    if sku.trim().is_empty() {
        errors.insert("sku".into(), "sku is required".into());
    }

    let draft = ProductDraft {
        sku: sku.trim().to_string(),
        name: name.to_string(),
        description: shared::util::non_blank(input.description.as_deref()),
        cost_price: input.cost_price,
        retail_price: input.retail_price,
        promotion_price: input.promotion_price,
        promotion_start: input.promotion_start,
        promotion_end: input.promotion_end,
        stock_quantity: input.stock_quantity,
        reorder_level: input.reorder_level,
        category_id: input.category_id,
        subcategory_id: input.subcategory_id,
        is_vegan: input.is_vegan,
        is_gluten_free: input.is_gluten_free,
        is_age_restricted: input.is_age_restricted,
        minimum_age: input.minimum_age,
        status: input.status,
        online_visible: input.online_visible,
        barcode: shared::util::non_blank(input.barcode.as_deref()),
    };

    check_draft(&draft, &mut errors);
    if errors.is_empty() {
        Ok(draft)
    } else {
        Err(errors)
    }
}

/// Product invariants common to every write path
fn check_draft(draft: &ProductDraft, errors: &mut FieldErrors) {
    if draft.cost_price < min_price() {
        errors.insert("cost_price".into(), "cost_price must be at least 0.01".into());
    }
    if draft.retail_price < min_price() {
        errors.insert(
            "retail_price".into(),
            "retail_price must be at least 0.01".into(),
        );
    }
    if draft.stock_quantity < 0 {
        errors.insert(
            "stock_quantity".into(),
            "stock_quantity must be 0 or greater".into(),
        );
    }
    if draft.reorder_level < 0 {
        errors.insert(
            "reorder_level".into(),
            "reorder_level must be 0 or greater".into(),
        );
    }
    if let Some(promo) = draft.promotion_price {
        if promo < min_price() {
            errors.insert(
                "promotion_price".into(),
                "promotion_price must be at least 0.01".into(),
            );
        } else if promo >= draft.retail_price {
            errors.insert(
                "promotion_price".into(),
                "promotion_price must be less than retail_price".into(),
            );
        }
    }
    if let (Some(start), Some(end)) = (draft.promotion_start, draft.promotion_end)
        && end < start
    {
        errors.insert(
            "promotion_end".into(),
            "promotion_end must not be before promotion_start".into(),
        );
    }
    if draft.is_age_restricted && draft.minimum_age.is_none_or(|age| age < 1) {
        errors.insert(
            "minimum_age".into(),
            "minimum_age must be at least 1 for age-restricted products".into(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn cat() -> Uuid {
        Uuid::from_u128(7)
    }

    fn categories() -> HashSet<Uuid> {
        HashSet::from([cat()])
    }

    fn item(name: &str) -> ProductImportItem {
        ProductImportItem {
            item_name: name.into(),
            sku: Some(" MILK-1 ".into()),
            cost_price: Decimal::new(80, 2),
            retail_price: Decimal::new(150, 2),
            stock_quantity: 10,
            category_id: Some(cat()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_item_defaults() {
        let draft = validate_item(&item("  Milk "), &categories()).unwrap();
        assert_eq!(draft.name, "Milk");
        assert_eq!(draft.sku, "MILK-1");
        assert_eq!(draft.status, ProductStatus::Active);
        assert!(draft.online_visible);
        assert!(!draft.is_vegan);
    }

    #[test]
    fn test_required_and_minimum_fields() {
        let mut bad = item("");
        bad.cost_price = Decimal::ZERO;
        bad.retail_price = Decimal::new(5, 3);
        bad.stock_quantity = -1;
        bad.reorder_level = -2;
        bad.category_id = None;

        let errors = validate_item(&bad, &categories()).unwrap_err();
        assert_eq!(errors["item_name"], "item_name is required");
        assert_eq!(errors["cost_price"], "cost_price must be at least 0.01");
        assert_eq!(errors["retail_price"], "retail_price must be at least 0.01");
        assert_eq!(errors["stock_quantity"], "stock_quantity must be 0 or greater");
        assert_eq!(errors["reorder_level"], "reorder_level must be 0 or greater");
        assert_eq!(errors["category_id"], "category_id is required");
    }

    #[test]
    fn test_unknown_category() {
        let mut row = item("Milk");
        row.category_id = Some(Uuid::from_u128(99));
        row.subcategory_id = Some(Uuid::from_u128(98));
        let errors = validate_item(&row, &categories()).unwrap_err();
        assert!(errors.contains_key("category_id"));
        assert!(errors.contains_key("subcategory_id"));
    }

    #[test]
    fn test_promotion_must_undercut_retail() {
        let mut row = item("Milk");
        row.promotion_price = Some(Decimal::new(150, 2));
        let errors = validate_item(&row, &categories()).unwrap_err();
        assert_eq!(
            errors["promotion_price"],
            "promotion_price must be less than retail_price"
        );

        row.promotion_price = Some(Decimal::new(149, 2));
        assert!(validate_item(&row, &categories()).is_ok());
    }

    #[test]
    fn test_promotion_window_order() {
        let mut row = item("Milk");
        let now = Utc::now();
        row.promotion_price = Some(Decimal::ONE);
        row.promotion_start = Some(now);
        row.promotion_end = Some(now - Duration::days(1));
        let errors = validate_item(&row, &categories()).unwrap_err();
        assert!(errors.contains_key("promotion_end"));
    }

    #[test]
    fn test_age_restriction_needs_minimum_age() {
        let mut row = item("Wine");
        row.is_age_restricted = Some(true);
        assert!(validate_item(&row, &categories()).unwrap_err().contains_key("minimum_age"));
        row.minimum_age = Some(0);
        assert!(validate_item(&row, &categories()).is_err());
        row.minimum_age = Some(18);
        assert!(validate_item(&row, &categories()).is_ok());
    }

    #[test]
    fn test_validate_input() {
        let input: ProductInput = serde_json::from_value(serde_json::json!({
            "name": "Oat milk",
            "cost_price": 1.1,
            "retail_price": 2.5,
            "category_id": cat(),
            "barcode": "  ",
        }))
        .unwrap();
        let draft = validate_input(&input, "OAT-1".into()).unwrap();
        assert_eq!(draft.sku, "OAT-1");
        assert!(draft.barcode.is_none());

        let errors = validate_input(&input, " ".into()).unwrap_err();
        assert_eq!(errors["sku"], "sku is required");
    }
}
