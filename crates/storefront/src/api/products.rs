//! Products, categories and product reviews.

use tracing::instrument;

use emporium_core::catalog::ProductSort;
use emporium_core::models::{Category, Product, Review};
use emporium_core::pagination::{MAX_PER_PAGE, Page, PageRequest};
use emporium_core::validation::forms::{NewCategory, NewReview, ProductInput};
use emporium_core::{CategoryId, ProductId};

use super::{ApiClient, ApiError, Caller, Invalidation, Params, QueryKey, Resource, params_key};

/// Server-side filters for `GET /products`.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub page: PageRequest,
    pub q: Option<String>,
    pub category: Option<String>,
    pub sort: ProductSort,
    /// Vendor filter; `me` lists the caller's own products.
    pub vendor: Option<String>,
}

impl ProductQuery {
    fn params(&self) -> Params {
        let mut params = vec![
            ("page", self.page.page().to_string()),
            ("per_page", self.page.per_page().to_string()),
            ("sort", self.sort.as_str().to_string()),
        ];
        if let Some(q) = self.q.as_deref().filter(|q| !q.trim().is_empty()) {
            params.push(("q", q.trim().to_string()));
        }
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            params.push(("category", category.to_string()));
        }
        if let Some(vendor) = self.vendor.as_deref().filter(|v| !v.is_empty()) {
            params.push(("vendor", vendor.to_string()));
        }
        params
    }
}

/// Upper bound on backend pages read for one filtered catalog view.
pub const MAX_SCAN_PAGES: u32 = 50;

/// Every product matching a query, read page by page.
#[derive(Debug, Clone, Default)]
pub struct ProductScan {
    pub items: Vec<Product>,
    /// Total the backend reported.
    pub total: u64,
    /// The page cap was reached before `total` items were read.
    pub truncated: bool,
}

impl ApiClient {
    /// Read every page of a product list, `MAX_PER_PAGE` at a time, until
    /// the reported total is reached, a page comes back empty or
    /// [`MAX_SCAN_PAGES`] pages have been read. The page in `query` is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns error if any page fails after retries.
    #[instrument(skip(self))]
    pub async fn scan_products(
        &self,
        caller: Caller<'_>,
        query: &ProductQuery,
    ) -> Result<ProductScan, ApiError> {
        let mut scan = ProductScan::default();
        let mut query = query.clone();

        for number in 1..=MAX_SCAN_PAGES {
            query.page = PageRequest::new(Some(number), Some(MAX_PER_PAGE));
            let page = self.list_products(caller, &query).await?;
            scan.total = page.total;
            if page.items.is_empty() {
                return Ok(scan);
            }
            scan.items.extend(page.items);
            if scan.items.len() as u64 >= scan.total {
                return Ok(scan);
            }
        }

        scan.truncated = true;
        tracing::warn!(
            read = scan.items.len(),
            total = scan.total,
            pages = MAX_SCAN_PAGES,
            "Product scan stopped at page cap"
        );
        Ok(scan)
    }

    /// List products. Vendor-filtered lists are scoped to the caller.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails after retries.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        caller: Caller<'_>,
        query: &ProductQuery,
    ) -> Result<Page<Product>, ApiError> {
        let params = query.params();
        let scope = query.vendor.as_ref().and(caller.scope());
        let key = QueryKey::list(Resource::Products, params_key(&params)).scoped(scope);
        self.query(key, "/products", &params, caller).await
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids.
    #[instrument(skip(self))]
    pub async fn product(&self, caller: Caller<'_>, id: ProductId) -> Result<Product, ApiError> {
        let key = QueryKey::entity(Resource::Product, id);
        self.query(key, &format!("/products/{id}"), &Vec::new(), caller)
            .await
    }

    /// Create a product and drop cached product lists.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the product.
    #[instrument(skip(self, input))]
    pub async fn create_product(
        &self,
        caller: Caller<'_>,
        input: &ProductInput,
    ) -> Result<Product, ApiError> {
        let product: Product = self.post("/products", input, caller).await?;
        self.cache()
            .invalidate(Invalidation::Resource(Resource::Products))
            .await;
        self.cache()
            .set(QueryKey::entity(Resource::Product, product.id), &product)
            .await;
        Ok(product)
    }

    /// Update a product; the cached detail is patched with the response.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the update.
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        caller: Caller<'_>,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, ApiError> {
        let product: Product = self.patch(&format!("/products/{id}"), input, caller).await?;
        self.cache()
            .invalidate(Invalidation::Resource(Resource::Products))
            .await;
        self.cache()
            .set(QueryKey::entity(Resource::Product, id), &product)
            .await;
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns error if the backend refuses the delete.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, caller: Caller<'_>, id: ProductId) -> Result<(), ApiError> {
        self.delete(&format!("/products/{id}"), caller).await?;
        self.cache()
            .invalidate(Invalidation::Resource(Resource::Products))
            .await;
        Ok(())
    }

    /// Approved reviews for a product.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails after retries.
    #[instrument(skip(self))]
    pub async fn product_reviews(
        &self,
        caller: Caller<'_>,
        id: ProductId,
    ) -> Result<Vec<Review>, ApiError> {
        let key = QueryKey::entity(Resource::Reviews, id);
        self.query(key, &format!("/products/{id}/reviews"), &Vec::new(), caller)
            .await
    }

    /// # Errors
    ///
    /// Returns error if the backend rejects the review.
    #[instrument(skip(self, review))]
    pub async fn submit_review(
        &self,
        caller: Caller<'_>,
        id: ProductId,
        review: &NewReview,
    ) -> Result<Review, ApiError> {
        let created: Review = self
            .post(&format!("/products/{id}/reviews"), review, caller)
            .await?;
        self.cache()
            .invalidate_many([
                Invalidation::Resource(Resource::Reviews),
                Invalidation::Entity(Resource::Product, id.as_i64()),
            ])
            .await;
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns error if the request fails after retries.
    #[instrument(skip(self))]
    pub async fn categories(&self, caller: Caller<'_>) -> Result<Vec<Category>, ApiError> {
        let key = QueryKey::list(Resource::Categories, "");
        self.query(key, "/categories", &Vec::new(), caller).await
    }

    /// # Errors
    ///
    /// Returns error if the backend rejects the category.
    #[instrument(skip(self))]
    pub async fn create_category(
        &self,
        caller: Caller<'_>,
        category: &NewCategory,
    ) -> Result<Category, ApiError> {
        let created: Category = self.post("/categories", category, caller).await?;
        self.cache()
            .invalidate(Invalidation::Resource(Resource::Categories))
            .await;
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns error if the backend refuses the delete.
    #[instrument(skip(self))]
    pub async fn delete_category(
        &self,
        caller: Caller<'_>,
        id: CategoryId,
    ) -> Result<(), ApiError> {
        self.delete(&format!("/categories/{id}"), caller).await?;
        self.cache()
            .invalidate_many([
                Invalidation::Resource(Resource::Categories),
                Invalidation::Resource(Resource::Products),
            ])
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_skip_blank_filters() {
        let query = ProductQuery {
            page: PageRequest::new(Some(2), Some(12)),
            q: Some("  ".to_string()),
            category: Some("kitchen".to_string()),
            sort: ProductSort::PriceAsc,
            vendor: None,
        };
        assert_eq!(
            params_key(&query.params()),
            "page=2&per_page=12&sort=price_asc&category=kitchen"
        );
    }
}
