//! Orders and their line items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Money, OrderId, OrderItemId, OrderStatus, ProductId, UserId, VendorId};

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub subtotal: Money,
    #[serde(default)]
    pub shipping: Money,
    pub total: Money,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Number of units across all items.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Items sold by one vendor (vendor order view).
    pub fn items_for_vendor(&self, vendor: VendorId) -> impl Iterator<Item = &OrderItem> {
        self.items.iter().filter(move |item| item.vendor_id == vendor)
    }
}

/// One product line within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub vendor_id: VendorId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Shipping destination.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    pub full_name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    /// Single-line rendering for tables and confirmations.
    #[must_use]
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.full_name.as_str(), self.line1.as_str()];
        if let Some(line2) = self.line2.as_deref().filter(|l| !l.is_empty()) {
            parts.push(line2);
        }
        parts.extend([self.city.as_str(), self.postal_code.as_str(), self.country.as_str()]);
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(vendor: i64, quantity: u32, cents: i64) -> OrderItem {
        OrderItem {
            id: OrderItemId::new(1),
            product_id: ProductId::new(1),
            product_name: "Mug".to_string(),
            vendor_id: VendorId::new(vendor),
            quantity,
            unit_price: Money::from_cents(cents),
        }
    }

    #[test]
    fn test_line_total() {
        assert_eq!(item(1, 3, 450).line_total(), Money::from_cents(1350));
    }

    #[test]
    fn test_item_count_and_vendor_filter() {
        let order = Order {
            id: OrderId::new(1),
            user_id: UserId::new(1),
            status: OrderStatus::Pending,
            items: vec![item(1, 2, 100), item(2, 5, 100)],
            subtotal: Money::from_cents(700),
            shipping: Money::zero(),
            total: Money::from_cents(700),
            shipping_address: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(order.item_count(), 7);
        assert_eq!(order.items_for_vendor(VendorId::new(2)).count(), 1);
    }

    #[test]
    fn test_address_one_line_skips_blank_line2() {
        let address = Address {
            full_name: "Ada Lovelace".to_string(),
            line1: "1 Analytical Way".to_string(),
            line2: Some(String::new()),
            city: "London".to_string(),
            postal_code: "N1 1AA".to_string(),
            country: "UK".to_string(),
        };
        assert_eq!(
            address.one_line(),
            "Ada Lovelace, 1 Analytical Way, London, N1 1AA, UK"
        );
    }
}
