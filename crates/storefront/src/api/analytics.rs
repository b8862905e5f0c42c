//! Dashboards and the vendor directory.

use tracing::instrument;

use emporium_core::models::{AnalyticsSnapshot, Vendor};

use super::{ApiClient, ApiError, Caller, QueryKey, Resource};

impl ApiClient {
    /// Marketplace-wide numbers (admin).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails after retries.
    #[instrument(skip(self))]
    pub async fn admin_analytics(&self, caller: Caller<'_>) -> Result<AnalyticsSnapshot, ApiError> {
        let key = QueryKey::list(Resource::Analytics, "admin").scoped(caller.scope());
        self.query(key, "/admin/analytics", &Vec::new(), caller)
            .await
    }

    /// The calling vendor's own sales.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails after retries.
    #[instrument(skip(self))]
    pub async fn vendor_analytics(
        &self,
        caller: Caller<'_>,
    ) -> Result<AnalyticsSnapshot, ApiError> {
        let key = QueryKey::list(Resource::Analytics, "vendor").scoped(caller.scope());
        self.query(key, "/vendors/me/analytics", &Vec::new(), caller)
            .await
    }

    /// # Errors
    ///
    /// Returns error if the request fails after retries.
    #[instrument(skip(self))]
    pub async fn vendors(&self, caller: Caller<'_>) -> Result<Vec<Vendor>, ApiError> {
        let key = QueryKey::list(Resource::Vendors, "").scoped(caller.scope());
        self.query(key, "/vendors", &Vec::new(), caller).await
    }
}
