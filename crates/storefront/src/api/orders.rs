//! Order endpoints. The backend scopes lists by token: customers see their
//! own orders, vendors the orders containing their products, admins all.

use tracing::instrument;

use emporium_core::models::Order;
use emporium_core::pagination::{Page, PageRequest};
use emporium_core::validation::forms::{NewOrder, OrderStatusUpdate};
use emporium_core::{OrderId, OrderStatus};

use super::{ApiClient, ApiError, Caller, Invalidation, Params, QueryKey, Resource, params_key};

#[derive(Debug, Clone, Copy, Default)]
pub struct OrderQuery {
    pub page: PageRequest,
    pub status: Option<OrderStatus>,
}

impl OrderQuery {
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
    pub async fn orders(
        &self,
        caller: Caller<'_>,
        query: &OrderQuery,
    ) -> Result<Page<Order>, ApiError> {
        let params = query.params();
        let key = QueryKey::list(Resource::Orders, params_key(&params)).scoped(caller.scope());
        self.query(key, "/orders", &params, caller).await
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` when the order is unknown or not visible
    /// to the caller.
    #[instrument(skip(self))]
    pub async fn order(&self, caller: Caller<'_>, id: OrderId) -> Result<Order, ApiError> {
        let key = QueryKey::entity(Resource::Order, id).scoped(caller.scope());
        self.query(key, &format!("/orders/{id}"), &Vec::new(), caller)
            .await
    }

    /// Place an order from the caller's cart.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the order.
    #[instrument(skip(self, order))]
    pub async fn place_order(&self, caller: Caller<'_>, order: &NewOrder) -> Result<Order, ApiError> {
        let placed: Order = self.post("/orders", order, caller).await?;
        self.invalidate_cart(caller).await;
        self.cache()
            .invalidate_many([
                Invalidation::Resource(Resource::Orders),
                Invalidation::Resource(Resource::Analytics),
                Invalidation::Resource(Resource::Products),
            ])
            .await;
        Ok(placed)
    }

    /// Move an order to a new status (cancel, ship, refund...).
    ///
    /// The current status is read first and the move is refused locally
    /// unless [`OrderStatus::can_transition_to`] allows it.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Transition` for a move the current status does not
    /// allow, or an error if the backend rejects the update.
    #[instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        caller: Caller<'_>,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, ApiError> {
        let current = self.order(caller, id).await?.status;
        if !current.can_transition_to(status) {
            return Err(ApiError::Transition {
                from: current,
                to: status,
            });
        }
        let updated: Order = self
            .patch(&format!("/orders/{id}"), &OrderStatusUpdate { status }, caller)
            .await?;
        self.cache()
            .invalidate_many([
                Invalidation::Resource(Resource::Orders),
                Invalidation::Resource(Resource::Analytics),
            ])
            .await;
        self.cache()
            .set(
                QueryKey::entity(Resource::Order, id).scoped(caller.scope()),
                &updated,
            )
            .await;
        Ok(updated)
    }
}
