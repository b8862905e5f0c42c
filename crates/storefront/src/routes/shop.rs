//! Home page, catalog and product detail.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use emporium_core::ProductId;
use emporium_core::catalog::{ProductFilter, ProductSort};
use emporium_core::models::{Category, Review};
use emporium_core::pagination::{PageRequest, paginate};
use emporium_core::validation::ValidationErrors;
use emporium_core::validation::forms::ReviewForm;

use crate::api::{Caller, ProductQuery};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::state::AppState;
use crate::store::{Chrome, CurrentUser, Store};
use crate::views::{Pager, ProductCard, SelectOption, stars};

const CATALOG_PER_PAGE: u32 = 12;
const FEATURED_COUNT: u32 = 8;

#[derive(Template, WebTemplate)]
#[template(path = "shop/home.html")]
pub struct HomeTemplate {
    pub chrome: Chrome,
    pub featured: Vec<ProductCard>,
    pub categories: Vec<Category>,
}

/// Home page: newest products and the category list.
#[instrument(skip(state, store, user))]
pub async fn home(
    State(state): State<AppState>,
    store: Store,
    OptionalAuth(user): OptionalAuth,
) -> Result<HomeTemplate, AppError> {
    let caller = Caller::from_option(user.as_ref());
    let query = ProductQuery {
        page: PageRequest::new(Some(1), Some(FEATURED_COUNT)),
        ..ProductQuery::default()
    };
    let products = state.api().list_products(caller, &query).await?;
    let categories = state.api().categories(caller).await?;
    let wishlisted = store.wishlist_products().await;

    Ok(HomeTemplate {
        featured: products
            .items
            .iter()
            .filter(|p| p.active)
            .map(|p| ProductCard::new(p, &wishlisted))
            .collect(),
        categories,
        chrome: store.chrome().await,
    })
}

/// Catalog query string. Everything arrives as text so a bad value falls
/// back to its default instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
    pub min_rating: Option<String>,
    pub in_stock: Option<String>,
    pub page: Option<String>,
}

impl CatalogParams {
    fn filter(&self) -> ProductFilter {
        let min_rating = self
            .min_rating
            .as_deref()
            .and_then(|r| r.trim().parse::<f64>().ok());
        let in_stock = self
            .in_stock
            .as_deref()
            .is_some_and(|v| matches!(v, "1" | "true" | "on"));
        ProductFilter::new(min_rating, in_stock)
    }

    fn page(&self) -> Option<u32> {
        self.page.as_deref().and_then(|p| p.trim().parse().ok())
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "shop/catalog.html")]
pub struct CatalogTemplate {
    pub chrome: Chrome,
    pub products: Vec<ProductCard>,
    pub pager: Pager,
    pub total: u64,
    /// Filtered results only cover the first products the scan read.
    pub truncated: bool,
    pub q: String,
    pub categories: Vec<SelectOption>,
    pub sorts: Vec<SelectOption>,
    pub ratings: Vec<SelectOption>,
    pub in_stock: bool,
}

/// Product catalog.
///
/// Rating and stock filters are not understood by the backend, so when one is
/// set the catalog reads every page of the server list, filters it and
/// paginates the result locally. Inactive products are dropped either way.
#[instrument(skip(state, store, user))]
pub async fn catalog(
    State(state): State<AppState>,
    store: Store,
    OptionalAuth(user): OptionalAuth,
    Query(params): Query<CatalogParams>,
) -> Result<CatalogTemplate, AppError> {
    let caller = Caller::from_option(user.as_ref());
    let filter = params.filter();
    let sort = ProductSort::parse(params.sort.as_deref());
    let requested = PageRequest::new(params.page(), Some(CATALOG_PER_PAGE));

    if let Some(q) = &params.q {
        store.set_search(q).await?;
    }

    let query = ProductQuery {
        page: requested,
        q: params.q.clone(),
        category: params.category.clone(),
        sort,
        vendor: None,
    };

    let mut truncated = false;
    let page = if filter.is_active() {
        let scan = state.api().scan_products(caller, &query).await?;
        truncated = scan.truncated;
        let matching = filter.apply(scan.items);
        tracing::debug!(matching = matching.len(), "Applied catalog post-filter");
        paginate(&matching, requested)
    } else {
        let mut page = state.api().list_products(caller, &query).await?;
        let listed = page.items.len();
        page.items.retain(|p| p.active);
        let hidden = (listed - page.items.len()) as u64;
        page.total = page.total.saturating_sub(hidden);
        page
    };

    let categories = state.api().categories(caller).await?;
    let wishlisted = store.wishlist_products().await;

    let q = params.q.clone().unwrap_or_default();
    let category = params.category.clone().unwrap_or_default();
    let min_rating = filter
        .min_rating
        .filter(|r| *r > 0.0)
        .map(|r| r.to_string())
        .unwrap_or_default();
    let pager = Pager::new(
        &page,
        "/products",
        &[
            ("q", q.clone()),
            ("category", category.clone()),
            ("sort", sort.as_str().to_string()),
            ("min_rating", min_rating.clone()),
            (
                "in_stock",
                if filter.in_stock_only { "1" } else { "" }.to_string(),
            ),
        ],
    );

    let mut category_options = vec![SelectOption::any("All categories", &category)];
    category_options.extend(categories.iter().map(|c| {
        SelectOption::new(
            c.slug.clone(),
            format!("{} ({})", c.name, c.product_count),
            &category,
        )
    }));

    let mut rating_options = vec![SelectOption::any("Any rating", &min_rating)];
    rating_options.extend(
        (1..=4).map(|r| SelectOption::new(r.to_string(), format!("{r}+ stars"), &min_rating)),
    );

    Ok(CatalogTemplate {
        products: page
            .items
            .iter()
            .map(|p| ProductCard::new(p, &wishlisted))
            .collect(),
        total: page.total,
        truncated,
        pager,
        q,
        categories: category_options,
        sorts: ProductSort::ALL
            .into_iter()
            .map(|s| SelectOption::new(s.as_str(), s.label(), sort.as_str()))
            .collect(),
        ratings: rating_options,
        in_stock: filter.in_stock_only,
        chrome: store.chrome().await,
    })
}

/// A review as shown under a product.
#[derive(Debug, Clone)]
pub struct ReviewView {
    pub author: String,
    pub stars: String,
    pub title: String,
    pub body: String,
    pub date: String,
}

impl From<&Review> for ReviewView {
    fn from(review: &Review) -> Self {
        Self {
            author: review.author_name.clone(),
            stars: review.star_string(),
            title: review.title.clone(),
            body: review.body.clone(),
            date: review.created_at.format("%b %d, %Y").to_string(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "shop/product.html")]
pub struct ProductTemplate {
    pub chrome: Chrome,
    pub product: ProductCard,
    pub description: String,
    pub average: String,
    pub reviews: Vec<ReviewView>,
    pub signed_in: bool,
    pub wishlists: Vec<SelectOption>,
    pub form: ReviewForm,
    pub ratings: Vec<SelectOption>,
    pub errors: ValidationErrors,
    pub form_error: Option<String>,
}

async fn render_product(
    state: &AppState,
    store: &Store,
    user: Option<&CurrentUser>,
    id: ProductId,
    form: ReviewForm,
    errors: ValidationErrors,
    form_error: Option<String>,
) -> Result<ProductTemplate, AppError> {
    let caller = Caller::from_option(user);
    let product = state.api().product(caller, id).await?;
    let reviews = state.api().product_reviews(caller, id).await?;
    let wishlists = match user {
        Some(_) => state.api().wishlists(caller).await?,
        None => Vec::new(),
    };
    let wishlisted = store.wishlist_products().await;

    Ok(ProductTemplate {
        product: ProductCard::new(&product, &wishlisted),
        description: product.description.clone(),
        average: format!("{:.1}", product.rating),
        reviews: reviews.iter().map(ReviewView::from).collect(),
        signed_in: user.is_some(),
        wishlists: wishlists
            .iter()
            .map(|w| SelectOption::new(w.id.to_string(), w.name.clone(), ""))
            .collect(),
        ratings: (1..=5u8)
            .rev()
            .map(|r| SelectOption::new(r.to_string(), stars(r), &form.rating))
            .collect(),
        form,
        errors,
        form_error,
        chrome: store.chrome().await,
    })
}

/// Product detail page.
#[instrument(skip(state, store, user))]
pub async fn product(
    State(state): State<AppState>,
    store: Store,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<ProductId>,
) -> Result<ProductTemplate, AppError> {
    let form = ReviewForm {
        rating: "5".to_string(),
        ..ReviewForm::default()
    };
    render_product(
        &state,
        &store,
        user.as_ref(),
        id,
        form,
        ValidationErrors::default(),
        None,
    )
    .await
}

/// Submit a review. Invalid input re-renders the page without calling the
/// backend.
#[instrument(skip(state, store, user, form))]
pub async fn submit_review(
    State(state): State<AppState>,
    store: Store,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
    Form(form): Form<ReviewForm>,
) -> Result<Response, AppError> {
    let review = match form.validate() {
        Ok(review) => review,
        Err(errors) => {
            let page = render_product(&state, &store, Some(&user), id, form, errors, None).await?;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    match state
        .api()
        .submit_review(Caller::user(&user), id, &review)
        .await
    {
        Ok(created) => {
            tracing::info!(review_id = %created.id, product_id = %id, "Review submitted");
            store
                .flash_success("Thanks! Your review will appear once it is approved.")
                .await?;
            Ok(Redirect::to(&format!("/products/{id}")).into_response())
        }
        Err(e) => {
            let message = super::form_failure(e)?;
            let page = render_product(
                &state,
                &store,
                Some(&user),
                id,
                form,
                ValidationErrors::default(),
                Some(message),
            )
            .await?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_filter_parsing() {
        let params = CatalogParams {
            min_rating: Some("4".to_string()),
            in_stock: Some("on".to_string()),
            ..CatalogParams::default()
        };
        let filter = params.filter();
        assert_eq!(filter.min_rating, Some(4.0));
        assert!(filter.in_stock_only);
        assert!(filter.is_active());
    }

    #[test]
    fn test_bad_catalog_values_fall_back() {
        let params = CatalogParams {
            min_rating: Some("lots".to_string()),
            page: Some("-3".to_string()),
            ..CatalogParams::default()
        };
        assert!(!params.filter().is_active());
        assert_eq!(params.page(), None);
    }
}
