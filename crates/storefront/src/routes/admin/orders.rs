//! Every order on the marketplace, with bulk status changes.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use emporium_core::pagination::PageRequest;
use emporium_core::{OrderId, OrderStatus};

use super::{
    ReturnForm, SelectAllForm, SelectForm, back_to, bulk_targets, finish_bulk, id_param,
    nothing_selected, select_rows, toggle_row,
};
use crate::api::{Caller, OrderQuery};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::routes::account::{OrderListParams, status_filter};
use crate::services::bulk::run_sequential;
use crate::state::AppState;
use crate::store::{BulkTable, Chrome, Store};
use crate::views::{OrderRow, Pager, SelectOption, order_status_options};

const ORDERS_PER_PAGE: u32 = 25;
const ORDERS_PATH: &str = "/admin/orders";

#[derive(Template, WebTemplate)]
#[template(path = "admin/orders.html")]
pub struct OrdersTemplate {
    pub chrome: Chrome,
    pub orders: Vec<OrderRow>,
    pub pager: Pager,
    pub statuses: Vec<SelectOption>,
    /// Targets for the bulk status form.
    pub bulk_statuses: Vec<SelectOption>,
    pub page_ids: String,
    pub selected: usize,
    pub return_to: String,
}

#[instrument(skip(state, store, user))]
pub async fn index(
    State(state): State<AppState>,
    store: Store,
    RequireAdmin(user): RequireAdmin,
    Query(params): Query<OrderListParams>,
) -> Result<OrdersTemplate, AppError> {
    let status = params.status();
    let query = OrderQuery {
        page: PageRequest::new(params.page(), Some(ORDERS_PER_PAGE)),
        status,
    };
    let page = state.api().orders(Caller::user(&user), &query).await?;
    let selection = store.selection::<OrderId>(BulkTable::Orders).await;
    let pager = Pager::new(
        &page,
        ORDERS_PATH,
        &[("status", status.map_or_else(String::new, |s| s.as_str().to_string()))],
    );

    let ids: Vec<OrderId> = page.items.iter().map(|o| o.id).collect();
    Ok(OrdersTemplate {
        orders: page
            .items
            .iter()
            .map(|o| OrderRow::new(o, selection.contains(o.id)))
            .collect(),
        return_to: pager
            .links
            .iter()
            .find(|l| l.current)
            .map_or_else(|| ORDERS_PATH.to_string(), |l| l.href.clone()),
        pager,
        statuses: status_filter(status),
        bulk_statuses: order_status_options(
            &OrderStatus::reachable(),
            OrderStatus::Processing.as_str(),
        ),
        page_ids: id_param(&ids),
        selected: selection.len(),
        chrome: store.chrome().await,
    })
}

#[instrument(skip(store, _user))]
pub async fn select(
    store: Store,
    RequireAdmin(_user): RequireAdmin,
    Form(form): Form<SelectForm>,
) -> Result<Response, AppError> {
    toggle_row::<OrderId>(&store, BulkTable::Orders, &form.id).await?;
    Ok(back_to(form.return_to.as_deref(), ORDERS_PATH))
}

#[instrument(skip(store, _user))]
pub async fn select_all(
    store: Store,
    RequireAdmin(_user): RequireAdmin,
    Form(form): Form<SelectAllForm>,
) -> Result<Response, AppError> {
    select_rows::<OrderId>(&store, BulkTable::Orders, &form.ids).await?;
    Ok(back_to(form.return_to.as_deref(), ORDERS_PATH))
}

#[instrument(skip(store, _user))]
pub async fn clear_selection(
    store: Store,
    RequireAdmin(_user): RequireAdmin,
    Form(form): Form<ReturnForm>,
) -> Result<Response, AppError> {
    store.clear_selection(BulkTable::Orders).await?;
    Ok(back_to(form.return_to.as_deref(), ORDERS_PATH))
}

#[derive(Debug, Deserialize)]
pub struct BulkStatusForm {
    pub status: OrderStatus,
    #[serde(default)]
    pub ids: String,
}

/// Move every selected order to one status, one PATCH per order.
#[instrument(skip(state, store, user))]
pub async fn bulk_status(
    State(state): State<AppState>,
    store: Store,
    RequireAdmin(user): RequireAdmin,
    Form(form): Form<BulkStatusForm>,
) -> Result<Response, AppError> {
    let ids: Vec<OrderId> = bulk_targets(&store, BulkTable::Orders, &form.ids).await?;
    if ids.is_empty() {
        nothing_selected(&store).await?;
        return Ok(Redirect::to(ORDERS_PATH).into_response());
    }

    let api = state.api();
    let caller = Caller::user(&user);
    let status = form.status;
    let outcome = run_sequential("update order status", &ids, |id| async move {
        api.update_order_status(caller, id, status).await.map(drop)
    })
    .await;

    tracing::info!(status = %status, "Bulk order status run finished");
    finish_bulk(&store, BulkTable::Orders, &outcome, "Updated", "order").await?;
    Ok(Redirect::to(ORDERS_PATH).into_response())
}
