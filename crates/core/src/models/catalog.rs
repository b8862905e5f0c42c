//! Catalog records: products, categories and vendors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, Money, ProductId, VendorId};

/// Stock level at or below which a product is flagged as running low.
pub const LOW_STOCK_THRESHOLD: u32 = 5;

/// A product listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub vendor_id: VendorId,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub compare_at_price: Option<Money>,
    #[serde(default)]
    pub stock: u32,
    /// Average rating on a 0-5 scale.
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

const fn default_true() -> bool {
    true
}

impl Product {
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    #[must_use]
    pub const fn low_stock(&self) -> bool {
        self.stock > 0 && self.stock <= LOW_STOCK_THRESHOLD
    }

    /// True when a higher "was" price is set.
    #[must_use]
    pub fn on_sale(&self) -> bool {
        self.compare_at_price
            .is_some_and(|was| was.amount > self.price.amount)
    }

    /// Rating rounded to whole stars for display (0-5).
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn stars(&self) -> u8 {
        self.rating.clamp(0.0, 5.0).round() as u8
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub product_count: u32,
}

/// A seller on the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: VendorId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(stock: u32, rating: f64) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "vendor_id": 2,
            "name": "Lamp",
            "price": { "amount": "20.00" },
            "stock": stock,
            "rating": rating,
            "created_at": "2026-01-01T00:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let p = product(3, 4.4);
        assert!(p.active);
        assert!(p.description.is_empty());
        assert_eq!(p.category_id, None);
    }

    #[test]
    fn test_stock_flags() {
        assert!(!product(0, 0.0).in_stock());
        assert!(product(3, 0.0).low_stock());
        assert!(!product(30, 0.0).low_stock());
    }

    #[test]
    fn test_stars_rounding() {
        assert_eq!(product(1, 4.4).stars(), 4);
        assert_eq!(product(1, 4.5).stars(), 5);
        assert_eq!(product(1, 9.0).stars(), 5);
    }

    #[test]
    fn test_on_sale() {
        let mut p = product(1, 0.0);
        assert!(!p.on_sale());
        p.compare_at_price = Some(Money::from_cents(2500));
        assert!(p.on_sale());
    }
}
