//! Review moderation endpoints (admin).

use tracing::instrument;

use emporium_core::models::Review;
use emporium_core::pagination::{Page, PageRequest};
use emporium_core::validation::forms::ReviewModeration;
use emporium_core::{ReviewId, ReviewStatus};

use super::{ApiClient, ApiError, Caller, Invalidation, Params, QueryKey, Resource, params_key};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewQuery {
    pub page: PageRequest,
    pub status: Option<ReviewStatus>,
}

impl ReviewQuery {
    fn params(&self) -> Params {
        let mut params = vec![
            ("page", self.page.page().to_string()),
            ("per_page", self.page.per_page().to_string()),
        ];
        if let Some(status) = self.status {
            params.push(("status", status.as_str().to_string()));
        }
        params
    }
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns error if the request fails after retries.
    #[instrument(skip(self))]
    pub async fn reviews(
        &self,
        caller: Caller<'_>,
        query: &ReviewQuery,
    ) -> Result<Page<Review>, ApiError> {
        let params = query.params();
        let key = QueryKey::list(Resource::Reviews, params_key(&params)).scoped(caller.scope());
        self.query(key, "/reviews", &params, caller).await
    }

    /// Approve or reject a review.
    ///
    /// Does not touch the cache; bulk runs invalidate once at the end.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the moderation.
    #[instrument(skip(self))]
    pub async fn moderate_review(
        &self,
        caller: Caller<'_>,
        id: ReviewId,
        status: ReviewStatus,
    ) -> Result<Review, ApiError> {
        self.patch(&format!("/reviews/{id}"), &ReviewModeration { status }, caller)
            .await
    }

    /// # Errors
    ///
    /// Returns error if the backend refuses the delete.
    #[instrument(skip(self))]
    pub async fn delete_review(&self, caller: Caller<'_>, id: ReviewId) -> Result<(), ApiError> {
        self.delete(&format!("/reviews/{id}"), caller).await
    }

    /// Drop cached reviews and the product ratings they feed.
    pub async fn invalidate_reviews(&self) {
        self.cache()
            .invalidate_many([
                Invalidation::Resource(Resource::Reviews),
                Invalidation::Resource(Resource::Products),
            ])
            .await;
    }
}
