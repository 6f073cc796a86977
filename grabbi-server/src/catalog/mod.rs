//! Catalog resolver: effective prices, availability and delivery geometry

pub mod geo;
pub mod pricing;

pub use pricing::{EffectivePricing, product_view};
