//! Review moderation queue.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use emporium_core::models::Review;
use emporium_core::pagination::PageRequest;
use emporium_core::{ReviewId, ReviewStatus};

use super::{
    BulkForm, ReturnForm, SelectAllForm, SelectForm, back_to, bulk_targets, finish_bulk, id_param,
    nothing_selected, select_rows, toggle_row,
};
use crate::api::{Caller, ReviewQuery};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::services::bulk::run_sequential;
use crate::state::AppState;
use crate::store::{BulkTable, Chrome, CurrentUser, Store};
use crate::views::{Pager, SelectOption, stars};

const REVIEWS_PER_PAGE: u32 = 25;
const REVIEWS_PATH: &str = "/admin/reviews";

#[derive(Debug, Default, Deserialize)]
pub struct ReviewListParams {
    pub status: Option<String>,
    pub page: Option<String>,
}

impl ReviewListParams {
    /// Pending unless another status (or `all`) is asked for.
    fn status(&self) -> Option<ReviewStatus> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Some(ReviewStatus::Pending),
            Some(raw) => raw.parse().ok(),
        }
    }

    fn page(&self) -> Option<u32> {
        self.page.as_deref().and_then(|p| p.trim().parse().ok())
    }
}

#[derive(Debug, Clone)]
pub struct ReviewRow {
    pub id: ReviewId,
    pub product: String,
    pub product_id: String,
    pub author: String,
    pub stars: String,
    pub title: String,
    pub body: String,
    pub status: &'static str,
    pub date: String,
    pub selected: bool,
}

impl ReviewRow {
    fn new(review: &Review, selected: bool) -> Self {
        Self {
            id: review.id,
            product: review
                .product_name
                .clone()
                .unwrap_or_else(|| format!("Product #{}", review.product_id)),
            product_id: review.product_id.to_string(),
            author: review.author_name.clone(),
            stars: stars(review.rating),
            title: review.title.clone(),
            body: review.body.clone(),
            status: review.status.as_str(),
            date: review.created_at.format("%b %d, %Y").to_string(),
            selected,
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/reviews.html")]
pub struct ReviewsTemplate {
    pub chrome: Chrome,
    pub reviews: Vec<ReviewRow>,
    pub pager: Pager,
    pub statuses: Vec<SelectOption>,
    pub page_ids: String,
    pub selected: usize,
    pub return_to: String,
}

#[instrument(skip(state, store, user))]
pub async fn index(
    State(state): State<AppState>,
    store: Store,
    RequireAdmin(user): RequireAdmin,
    Query(params): Query<ReviewListParams>,
) -> Result<ReviewsTemplate, AppError> {
    let status = params.status();
    let query = ReviewQuery {
        page: PageRequest::new(params.page(), Some(REVIEWS_PER_PAGE)),
        status,
    };
    let page = state.api().reviews(Caller::user(&user), &query).await?;
    let selection = store.selection::<ReviewId>(BulkTable::Reviews).await;

    let current = status.map_or("all", ReviewStatus::as_str);
    let pager = Pager::new(&page, REVIEWS_PATH, &[("status", current.to_string())]);
    let statuses = vec![
        SelectOption::new("pending", "Pending", current),
        SelectOption::new("approved", "Approved", current),
        SelectOption::new("rejected", "Rejected", current),
        SelectOption::new("all", "All reviews", current),
    ];

    let ids: Vec<ReviewId> = page.items.iter().map(|r| r.id).collect();
    Ok(ReviewsTemplate {
        reviews: page
            .items
            .iter()
            .map(|r| ReviewRow::new(r, selection.contains(r.id)))
            .collect(),
        return_to: pager
            .links
            .iter()
            .find(|l| l.current)
            .map_or_else(|| REVIEWS_PATH.to_string(), |l| l.href.clone()),
        pager,
        statuses,
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
    toggle_row::<ReviewId>(&store, BulkTable::Reviews, &form.id).await?;
    Ok(back_to(form.return_to.as_deref(), REVIEWS_PATH))
}

#[instrument(skip(store, _user))]
pub async fn select_all(
    store: Store,
    RequireAdmin(_user): RequireAdmin,
    Form(form): Form<SelectAllForm>,
) -> Result<Response, AppError> {
    select_rows::<ReviewId>(&store, BulkTable::Reviews, &form.ids).await?;
    Ok(back_to(form.return_to.as_deref(), REVIEWS_PATH))
}

#[instrument(skip(store, _user))]
pub async fn clear_selection(
    store: Store,
    RequireAdmin(_user): RequireAdmin,
    Form(form): Form<ReturnForm>,
) -> Result<Response, AppError> {
    store.clear_selection(BulkTable::Reviews).await?;
    Ok(back_to(form.return_to.as_deref(), REVIEWS_PATH))
}

async fn moderate(
    state: &AppState,
    store: &Store,
    user: &CurrentUser,
    raw_ids: &str,
    status: ReviewStatus,
) -> Result<Response, AppError> {
    let ids: Vec<ReviewId> = bulk_targets(store, BulkTable::Reviews, raw_ids).await?;
    if ids.is_empty() {
        nothing_selected(store).await?;
        return Ok(Redirect::to(REVIEWS_PATH).into_response());
    }

    let api = state.api();
    let caller = Caller::user(user);
    let (label, verb) = match status {
        ReviewStatus::Approved => ("approve reviews", "Approved"),
        ReviewStatus::Rejected => ("reject reviews", "Rejected"),
        ReviewStatus::Pending => ("reopen reviews", "Reopened"),
    };
    let outcome = run_sequential(label, &ids, |id| async move {
        api.moderate_review(caller, id, status).await.map(drop)
    })
    .await;

    api.invalidate_reviews().await;
    finish_bulk(store, BulkTable::Reviews, &outcome, verb, "review").await?;
    Ok(Redirect::to(REVIEWS_PATH).into_response())
}

#[instrument(skip(state, store, user))]
pub async fn bulk_approve(
    State(state): State<AppState>,
    store: Store,
    RequireAdmin(user): RequireAdmin,
    Form(form): Form<BulkForm>,
) -> Result<Response, AppError> {
    moderate(&state, &store, &user, &form.ids, ReviewStatus::Approved).await
}

#[instrument(skip(state, store, user))]
pub async fn bulk_reject(
    State(state): State<AppState>,
    store: Store,
    RequireAdmin(user): RequireAdmin,
    Form(form): Form<BulkForm>,
) -> Result<Response, AppError> {
    moderate(&state, &store, &user, &form.ids, ReviewStatus::Rejected).await
}

#[instrument(skip(state, store, user))]
pub async fn bulk_delete(
    State(state): State<AppState>,
    store: Store,
    RequireAdmin(user): RequireAdmin,
    Form(form): Form<BulkForm>,
) -> Result<Response, AppError> {
    let ids: Vec<ReviewId> = bulk_targets(&store, BulkTable::Reviews, &form.ids).await?;
    if ids.is_empty() {
        nothing_selected(&store).await?;
        return Ok(Redirect::to(REVIEWS_PATH).into_response());
    }

    let api = state.api();
    let caller = Caller::user(&user);
    let outcome = run_sequential("delete reviews", &ids, |id| async move {
        api.delete_review(caller, id).await
    })
    .await;

    api.invalidate_reviews().await;
    finish_bulk(&store, BulkTable::Reviews, &outcome, "Deleted", "review").await?;
    Ok(Redirect::to(REVIEWS_PATH).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_defaults_to_pending() {
        let params = ReviewListParams::default();
        assert_eq!(params.status(), Some(ReviewStatus::Pending));
    }

    #[test]
    fn test_status_all_clears_filter() {
        let params = ReviewListParams {
            status: Some("all".to_string()),
            page: None,
        };
        assert_eq!(params.status(), None);
    }

    #[test]
    fn test_status_explicit() {
        let params = ReviewListParams {
            status: Some("rejected".to_string()),
            page: Some("2".to_string()),
        };
        assert_eq!(params.status(), Some(ReviewStatus::Rejected));
        assert_eq!(params.page(), Some(2));
    }
}
