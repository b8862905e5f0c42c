//! Admin console: marketplace analytics, users, orders, review moderation,
//! categories and vendors.
//!
//! Users, orders and reviews support row selection. The selection lives in
//! the session per table, survives paging and is cleared after every bulk
//! run. Bulk runs issue one request per id (see [`run_sequential`]).
//!
//! [`run_sequential`]: crate::services::bulk::run_sequential

pub mod categories;
pub mod orders;
pub mod reviews;
pub mod users;
pub mod vendors;

use std::fmt::Display;
use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::instrument;

use emporium_core::bulk::BulkOutcome;
use emporium_core::parse_id_list;
use emporium_core::selection::Selection;

use crate::api::Caller;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::state::AppState;
use crate::store::{BulkTable, Chrome, Store};
use crate::views::{AnalyticsView, local_path};

#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub chrome: Chrome,
    pub analytics: AnalyticsView,
}

/// Marketplace-wide analytics.
#[instrument(skip(state, store, user))]
pub async fn dashboard(
    State(state): State<AppState>,
    store: Store,
    RequireAdmin(user): RequireAdmin,
) -> Result<DashboardTemplate, AppError> {
    let snapshot = state.api().admin_analytics(Caller::user(&user)).await?;
    Ok(DashboardTemplate {
        analytics: AnalyticsView::new(&snapshot, true),
        chrome: store.chrome().await,
    })
}

// =============================================================================
// Row selection
// =============================================================================

/// Toggle one row.
#[derive(Debug, Deserialize)]
pub struct SelectForm {
    pub id: String,
    pub return_to: Option<String>,
}

/// Select every row on the current page. `ids` is comma separated.
#[derive(Debug, Deserialize)]
pub struct SelectAllForm {
    #[serde(default)]
    pub ids: String,
    pub return_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReturnForm {
    pub return_to: Option<String>,
}

/// Ids a bulk action should run over.
#[derive(Debug, Default, Deserialize)]
pub struct BulkForm {
    #[serde(default)]
    pub ids: String,
}

fn bad_ids(raw: &str) -> AppError {
    AppError::BadRequest(format!("Invalid id list: {raw}"))
}

pub(crate) async fn toggle_row<T>(store: &Store, table: BulkTable, raw: &str) -> Result<(), AppError>
where
    T: Copy + PartialEq + FromStr + Serialize + DeserializeOwned + Send + Sync,
{
    let id: T = raw.trim().parse().map_err(|_| bad_ids(raw))?;
    let mut selection = store.selection::<T>(table).await;
    selection.toggle(id);
    store.set_selection(table, &selection).await?;
    Ok(())
}

pub(crate) async fn select_rows<T>(store: &Store, table: BulkTable, raw: &str) -> Result<(), AppError>
where
    T: Copy + PartialEq + FromStr + Serialize + DeserializeOwned + Send + Sync,
{
    let ids: Vec<T> = parse_id_list(raw).map_err(|_| bad_ids(raw))?;
    let mut selection = store.selection::<T>(table).await;
    selection.select_all(ids);
    store.set_selection(table, &selection).await?;
    Ok(())
}

/// Redirect back to the table a selection form was posted from.
pub(crate) fn back_to(return_to: Option<&str>, fallback: &str) -> Response {
    Redirect::to(&local_path(return_to, fallback)).into_response()
}

/// Explicit ids from the form win over the stored selection.
pub(crate) async fn bulk_targets<T>(store: &Store, table: BulkTable, explicit: &str) -> Result<Vec<T>, AppError>
where
    T: Copy + PartialEq + FromStr + DeserializeOwned,
{
    let ids: Vec<T> = parse_id_list(explicit).map_err(|_| bad_ids(explicit))?;
    if !ids.is_empty() {
        return Ok(ids);
    }
    Ok(store.selection::<T>(table).await.ids().to_vec())
}

/// Comma separated ids for a hidden form field.
pub(crate) fn id_param<T: Copy + PartialEq + Display>(ids: &[T]) -> String {
    ids.iter().copied().collect::<Selection<T>>().to_param()
}

/// Report a bulk run and drop the selection it ran over.
pub(crate) async fn finish_bulk(
    store: &Store,
    table: BulkTable,
    outcome: &BulkOutcome,
    verb: &str,
    noun: &str,
) -> Result<(), AppError> {
    store.clear_selection(table).await?;
    let summary = outcome.summary(verb, noun);
    if outcome.has_failures() {
        store.flash_error(summary).await?;
    } else {
        store.flash_success(summary).await?;
    }
    Ok(())
}

pub(crate) async fn nothing_selected(store: &Store) -> Result<(), AppError> {
    store.flash_error("Select at least one row first.").await?;
    Ok(())
}

/// Create the admin console router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        .route("/users", get(users::index))
        .route("/users/select", post(users::select))
        .route("/users/select-all", post(users::select_all))
        .route("/users/select-clear", post(users::clear_selection))
        .route("/users/bulk/block", post(users::bulk_block))
        .route("/users/bulk/unblock", post(users::bulk_unblock))
        .route("/users/bulk/delete", post(users::confirm_bulk_delete))
        .route("/users/bulk/delete/confirm", post(users::bulk_delete))
        .route("/users/{id}/role", post(users::change_role))
        .route("/orders", get(orders::index))
        .route("/orders/select", post(orders::select))
        .route("/orders/select-all", post(orders::select_all))
        .route("/orders/select-clear", post(orders::clear_selection))
        .route("/orders/bulk/status", post(orders::bulk_status))
        .route("/reviews", get(reviews::index))
        .route("/reviews/select", post(reviews::select))
        .route("/reviews/select-all", post(reviews::select_all))
        .route("/reviews/select-clear", post(reviews::clear_selection))
        .route("/reviews/bulk/approve", post(reviews::bulk_approve))
        .route("/reviews/bulk/reject", post(reviews::bulk_reject))
        .route("/reviews/bulk/delete", post(reviews::bulk_delete))
        .route(
            "/categories",
            get(categories::index).post(categories::create),
        )
        .route("/categories/{id}/delete", post(categories::confirm_delete))
        .route("/categories/{id}/delete/confirm", post(categories::delete))
        .route("/vendors", get(vendors::index))
}
