//! Catalog browsing: sort orders and client-side product filters.
//!
//! The products endpoint understands `q`, `category`, `sort` and `vendor`.
//! Minimum rating and "in stock only" are not server parameters, so the
//! catalog view applies them to the fetched list before paging locally.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::Product;

/// Product sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Rating,
    Name,
}

impl ProductSort {
    pub const ALL: [Self; 5] = [
        Self::Newest,
        Self::PriceAsc,
        Self::PriceDesc,
        Self::Rating,
        Self::Name,
    ];

    /// Parse a query-string value. Anything unrecognised sorts newest first.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        let raw = raw.map(str::trim).unwrap_or_default();
        Self::ALL
            .into_iter()
            .find(|sort| sort.as_str() == raw)
            .unwrap_or_default()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::Rating => "rating",
            Self::Name => "name",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Newest => "Newest",
            Self::PriceAsc => "Price: low to high",
            Self::PriceDesc => "Price: high to low",
            Self::Rating => "Top rated",
            Self::Name => "Name",
        }
    }

    fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            Self::Newest => b.created_at.cmp(&a.created_at),
            Self::PriceAsc => a.price.amount.cmp(&b.price.amount),
            Self::PriceDesc => b.price.amount.cmp(&a.price.amount),
            Self::Rating => b.rating.total_cmp(&a.rating),
            Self::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        }
        .then_with(|| a.id.cmp(&b.id))
    }

    /// Sort in place. Ties break on id so paging is stable.
    pub fn apply(self, products: &mut [Product]) {
        products.sort_by(|a, b| self.compare(a, b));
    }
}

impl std::fmt::Display for ProductSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filters the products endpoint cannot apply.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductFilter {
    /// Lowest acceptable average rating, clamped to 0-5.
    pub min_rating: Option<f64>,
    #[serde(default)]
    pub in_stock_only: bool,
}

impl ProductFilter {
    #[must_use]
    pub fn new(min_rating: Option<f64>, in_stock_only: bool) -> Self {
        Self {
            min_rating: min_rating
                .filter(|r| r.is_finite())
                .map(|r| r.clamp(0.0, 5.0)),
            in_stock_only,
        }
    }

    /// Whether any post-filter is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.min_rating.is_some_and(|r| r > 0.0) || self.in_stock_only
    }

    /// Inactive products never show in the catalog, filtered or not.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if !product.active {
            return false;
        }
        if self.in_stock_only && !product.in_stock() {
            return false;
        }
        self.min_rating.is_none_or(|min| product.rating >= min)
    }

    /// Keep only matching products, preserving order.
    #[must_use]
    pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
        products.into_iter().filter(|p| self.matches(p)).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::types::{Money, ProductId, VendorId};

    fn product(id: i64, name: &str, cents: i64, rating: f64, stock: u32, day: u32) -> Product {
        Product {
            id: ProductId::new(id),
            vendor_id: VendorId::new(1),
            category_id: None,
            name: name.to_string(),
            description: String::new(),
            price: Money::from_cents(cents),
            compare_at_price: None,
            stock,
            rating,
            review_count: 0,
            image_url: None,
            active: true,
            created_at: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
        }
    }

    fn catalog() -> Vec<Product> {
        vec![
            product(1, "lamp", 2500, 4.5, 3, 1),
            product(2, "Bowl", 900, 3.0, 0, 2),
            product(3, "chair", 12000, 4.9, 10, 3),
            product(4, "Apron", 1500, 2.0, 7, 4),
        ]
    }

    fn ids(products: &[Product]) -> Vec<i64> {
        products.iter().map(|p| p.id.as_i64()).collect()
    }

    #[test]
    fn test_sort_parse_falls_back_to_newest() {
        assert_eq!(ProductSort::parse(Some("price_desc")), ProductSort::PriceDesc);
        assert_eq!(ProductSort::parse(Some("cheapest")), ProductSort::Newest);
        assert_eq!(ProductSort::parse(None), ProductSort::Newest);
    }

    #[test]
    fn test_sort_orders() {
        let mut products = catalog();
        ProductSort::Newest.apply(&mut products);
        assert_eq!(ids(&products), vec![4, 3, 2, 1]);

        ProductSort::PriceAsc.apply(&mut products);
        assert_eq!(ids(&products), vec![2, 4, 1, 3]);

        ProductSort::PriceDesc.apply(&mut products);
        assert_eq!(ids(&products), vec![3, 1, 4, 2]);

        ProductSort::Rating.apply(&mut products);
        assert_eq!(ids(&products), vec![3, 1, 2, 4]);

        ProductSort::Name.apply(&mut products);
        assert_eq!(ids(&products), vec![4, 2, 3, 1]);
    }

    #[test]
    fn test_filter_min_rating() {
        let filter = ProductFilter::new(Some(4.0), false);
        assert_eq!(ids(&filter.apply(catalog())), vec![1, 3]);
    }

    #[test]
    fn test_filter_in_stock() {
        let filter = ProductFilter::new(None, true);
        assert_eq!(ids(&filter.apply(catalog())), vec![1, 3, 4]);
    }

    #[test]
    fn test_filter_combined_and_clamped() {
        let filter = ProductFilter::new(Some(9.0), true);
        assert_eq!(filter.min_rating, Some(5.0));
        assert!(filter.apply(catalog()).is_empty());

        let filter = ProductFilter::new(Some(f64::NAN), false);
        assert_eq!(filter.min_rating, None);
        assert!(!filter.is_active());
    }

    #[test]
    fn test_filter_hides_inactive() {
        let mut products = catalog();
        products[0].active = false;
        let filtered = ProductFilter::default().apply(products);
        assert_eq!(ids(&filtered), vec![2, 3, 4]);
    }
}
