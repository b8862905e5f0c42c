//! Cart endpoints. Every cart mutation answers with the updated cart, which
//! replaces the cached copy.

use serde::Serialize;
use tracing::instrument;

use emporium_core::models::Cart;
use emporium_core::{CartLineId, ProductId};

use super::{ApiClient, ApiError, Caller, Invalidation, QueryKey, Resource};

#[derive(Debug, Serialize)]
struct AddCartItem {
    product_id: ProductId,
    quantity: u32,
}

#[derive(Debug, Serialize)]
struct SetQuantity {
    quantity: u32,
}

impl ApiClient {
    fn cart_key(caller: Caller<'_>) -> QueryKey {
        QueryKey::list(Resource::Cart, "").scoped(caller.scope())
    }

    async fn store_cart(&self, caller: Caller<'_>, cart: &Cart) {
        self.cache().set(Self::cart_key(caller), cart).await;
    }

    /// # Errors
    ///
    /// Returns error if the request fails after retries.
    #[instrument(skip(self))]
    pub async fn cart(&self, caller: Caller<'_>) -> Result<Cart, ApiError> {
        self.query(Self::cart_key(caller), "/cart", &Vec::new(), caller)
            .await
    }

    /// # Errors
    ///
    /// Returns error if the backend rejects the item (e.g. out of stock).
    #[instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        caller: Caller<'_>,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart, ApiError> {
        let body = AddCartItem {
            product_id,
            quantity,
        };
        let cart: Cart = self.post("/cart/items", &body, caller).await?;
        self.store_cart(caller, &cart).await;
        Ok(cart)
    }

    /// # Errors
    ///
    /// Returns error if the backend rejects the quantity.
    #[instrument(skip(self))]
    pub async fn update_cart_line(
        &self,
        caller: Caller<'_>,
        line: CartLineId,
        quantity: u32,
    ) -> Result<Cart, ApiError> {
        let cart: Cart = self
            .patch(&format!("/cart/items/{line}"), &SetQuantity { quantity }, caller)
            .await?;
        self.store_cart(caller, &cart).await;
        Ok(cart)
    }

    /// Remove a line and drop the cached cart.
    ///
    /// # Errors
    ///
    /// Returns error if the backend refuses the removal.
    #[instrument(skip(self))]
    pub async fn remove_cart_line(
        &self,
        caller: Caller<'_>,
        line: CartLineId,
    ) -> Result<(), ApiError> {
        self.delete(&format!("/cart/items/{line}"), caller).await?;
        self.invalidate_cart(caller).await;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns error if the backend refuses to empty the cart.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, caller: Caller<'_>) -> Result<(), ApiError> {
        self.delete("/cart", caller).await?;
        self.store_cart(caller, &Cart::default()).await;
        Ok(())
    }

    pub(crate) async fn invalidate_cart(&self, caller: Caller<'_>) {
        match caller.scope() {
            Some(user) => {
                self.cache()
                    .invalidate(Invalidation::Scoped(Resource::Cart, user))
                    .await;
            }
            None => {
                self.cache()
                    .invalidate(Invalidation::Resource(Resource::Cart))
                    .await;
            }
        }
    }
}
