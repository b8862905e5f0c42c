//! Named wishlists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ProductId, UserId, WishlistId};

/// A named list of saved products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wishlist {
    pub id: WishlistId,
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub product_ids: Vec<ProductId>,
    pub created_at: DateTime<Utc>,
}

impl Wishlist {
    #[must_use]
    pub fn contains(&self, product: ProductId) -> bool {
        self.product_ids.contains(&product)
    }
}
