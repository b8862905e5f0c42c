//! Shopping cart and its totals.
//!
//! The cart page renders each line total and the subtotal from the same
//! lines, so the displayed numbers always add up.

use serde::{Deserialize, Serialize};

use crate::types::{CartLineId, Money, ProductId};

/// Orders below this subtotal pay flat shipping.
pub const FREE_SHIPPING_THRESHOLD_CENTS: i64 = 5_000;

/// Flat shipping fee below the threshold.
pub const FLAT_SHIPPING_CENTS: i64 = 500;

/// Largest quantity a single line accepts.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// A customer's cart as returned by `GET /cart`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    pub lines: Vec<CartLine>,
}

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl CartLine {
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

impl Cart {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of quantities (cart badge).
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Flat fee below the free-shipping threshold; nothing for an empty cart.
    #[must_use]
    pub fn shipping(&self) -> Money {
        let subtotal = self.subtotal();
        if self.is_empty() || subtotal.amount >= Money::from_cents(FREE_SHIPPING_THRESHOLD_CENTS).amount {
            Money::zero()
        } else {
            Money::from_cents(FLAT_SHIPPING_CENTS)
        }
    }

    #[must_use]
    pub fn total(&self) -> Money {
        self.subtotal() + self.shipping()
    }

    /// How much more the customer must add for free shipping, if anything.
    #[must_use]
    pub fn remaining_for_free_shipping(&self) -> Option<Money> {
        let threshold = Money::from_cents(FREE_SHIPPING_THRESHOLD_CENTS);
        let subtotal = self.subtotal();
        (!self.is_empty() && subtotal.amount < threshold.amount)
            .then(|| Money::new(threshold.amount - subtotal.amount, subtotal.currency_code))
    }
}

/// Clamp a requested quantity for an update. `None` means remove the line.
#[must_use]
pub const fn clamp_quantity(requested: u32) -> Option<u32> {
    match requested {
        0 => None,
        q if q > MAX_LINE_QUANTITY => Some(MAX_LINE_QUANTITY),
        q => Some(q),
    }
}
