//! Wishlist endpoints. All of them are scoped to the calling user.

use serde::Serialize;
use tracing::instrument;

use emporium_core::models::Wishlist;
use emporium_core::validation::forms::NewWishlist;
use emporium_core::{ProductId, WishlistId};

use super::{ApiClient, ApiError, Caller, Invalidation, QueryKey, Resource};

#[derive(Debug, Serialize)]
struct WishlistItem {
    product_id: ProductId,
}

impl ApiClient {
    async fn invalidate_wishlists(&self, caller: Caller<'_>) {
        let target = caller.scope().map_or(
            Invalidation::Resource(Resource::Wishlists),
            |user| Invalidation::Scoped(Resource::Wishlists, user),
        );
        self.cache().invalidate(target).await;
    }

    /// # Errors
    ///
    /// Returns error if the request fails after retries.
    #[instrument(skip(self))]
    pub async fn wishlists(&self, caller: Caller<'_>) -> Result<Vec<Wishlist>, ApiError> {
        let key = QueryKey::list(Resource::Wishlists, "").scoped(caller.scope());
        self.query(key, "/wishlists", &Vec::new(), caller).await
    }

    /// # Errors
    ///
    /// Returns error if the backend rejects the wishlist.
    #[instrument(skip(self))]
    pub async fn create_wishlist(
        &self,
        caller: Caller<'_>,
        wishlist: &NewWishlist,
    ) -> Result<Wishlist, ApiError> {
        let created: Wishlist = self.post("/wishlists", wishlist, caller).await?;
        self.invalidate_wishlists(caller).await;
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns error if the backend refuses the delete.
    #[instrument(skip(self))]
    pub async fn delete_wishlist(&self, caller: Caller<'_>, id: WishlistId) -> Result<(), ApiError> {
        self.delete(&format!("/wishlists/{id}"), caller).await?;
        self.invalidate_wishlists(caller).await;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns error if the backend rejects the item.
    #[instrument(skip(self))]
    pub async fn add_wishlist_item(
        &self,
        caller: Caller<'_>,
        id: WishlistId,
        product_id: ProductId,
    ) -> Result<Wishlist, ApiError> {
        let updated: Wishlist = self
            .post(&format!("/wishlists/{id}/items"), &WishlistItem { product_id }, caller)
            .await?;
        self.invalidate_wishlists(caller).await;
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns error if the backend refuses the removal.
    #[instrument(skip(self))]
    pub async fn remove_wishlist_item(
        &self,
        caller: Caller<'_>,
        id: WishlistId,
        product_id: ProductId,
    ) -> Result<(), ApiError> {
        self.delete(&format!("/wishlists/{id}/items/{product_id}"), caller)
            .await?;
        self.invalidate_wishlists(caller).await;
        Ok(())
    }
}
