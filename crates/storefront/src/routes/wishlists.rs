//! Wishlist route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use emporium_core::models::Wishlist;
use emporium_core::validation::ValidationErrors;
use emporium_core::validation::forms::WishlistForm;
use emporium_core::{ProductId, WishlistId};

use crate::api::{ApiError, Caller};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::state::AppState;
use crate::store::{Chrome, CurrentUser, ModalKind, Store};
use crate::views::local_path;

/// A saved product inside a wishlist card.
#[derive(Debug, Clone)]
pub struct SavedProduct {
    pub id: ProductId,
    pub name: String,
    pub price: String,
    pub in_stock: bool,
}

#[derive(Debug, Clone)]
pub struct WishlistView {
    pub id: WishlistId,
    pub name: String,
    pub created: String,
    pub products: Vec<SavedProduct>,
}

#[derive(Template, WebTemplate)]
#[template(path = "wishlists/index.html")]
pub struct WishlistsTemplate {
    pub chrome: Chrome,
    pub wishlists: Vec<WishlistView>,
    pub form: WishlistForm,
    pub errors: ValidationErrors,
    pub form_error: Option<String>,
}

/// Refresh the saved-product hearts from the given wishlists.
pub(crate) async fn sync_badge(store: &Store, wishlists: &[Wishlist]) -> Result<(), AppError> {
    let mut saved: Vec<ProductId> = Vec::new();
    for id in wishlists.iter().flat_map(|w| w.product_ids.iter().copied()) {
        if !saved.contains(&id) {
            saved.push(id);
        }
    }
    store.set_wishlist_products(&saved).await?;
    Ok(())
}

/// Re-read the wishlists after a change and refresh the hearts.
async fn refresh_badge(state: &AppState, store: &Store, user: &CurrentUser) -> Result<(), AppError> {
    let wishlists = state.api().wishlists(Caller::user(user)).await?;
    sync_badge(store, &wishlists).await
}

async fn render_index(
    state: &AppState,
    store: &Store,
    user: &CurrentUser,
    form: WishlistForm,
    errors: ValidationErrors,
    form_error: Option<String>,
) -> Result<WishlistsTemplate, AppError> {
    let caller = Caller::user(user);
    let wishlists = state.api().wishlists(caller).await?;
    sync_badge(store, &wishlists).await?;

    let mut views = Vec::with_capacity(wishlists.len());
    for wishlist in &wishlists {
        let mut products = Vec::with_capacity(wishlist.product_ids.len());
        for &product_id in &wishlist.product_ids {
            match state.api().product(caller, product_id).await {
                Ok(product) => products.push(SavedProduct {
                    id: product.id,
                    name: product.name.clone(),
                    price: product.price.to_string(),
                    in_stock: product.in_stock(),
                }),
                // Saved products can be deleted by their vendor.
                Err(ApiError::NotFound { .. }) => {
                    tracing::debug!(%product_id, "Skipping removed wishlist product");
                }
                Err(e) => return Err(e.into()),
            }
        }
        views.push(WishlistView {
            id: wishlist.id,
            name: wishlist.name.clone(),
            created: wishlist.created_at.format("%b %d, %Y").to_string(),
            products,
        });
    }

    Ok(WishlistsTemplate {
        wishlists: views,
        form,
        errors,
        form_error,
        chrome: store.chrome().await,
    })
}

/// List the user's wishlists.
#[instrument(skip(state, store, user))]
pub async fn index(
    State(state): State<AppState>,
    store: Store,
    RequireAuth(user): RequireAuth,
) -> Result<WishlistsTemplate, AppError> {
    render_index(
        &state,
        &store,
        &user,
        WishlistForm::default(),
        ValidationErrors::default(),
        None,
    )
    .await
}

/// Create a wishlist. An invalid name re-renders the form and sends nothing
/// to the backend.
#[instrument(skip(state, store, user))]
pub async fn create(
    State(state): State<AppState>,
    store: Store,
    RequireAuth(user): RequireAuth,
    Form(form): Form<WishlistForm>,
) -> Result<Response, AppError> {
    let wishlist = match form.validate() {
        Ok(wishlist) => wishlist,
        Err(errors) => {
            let page = render_index(&state, &store, &user, form, errors, None).await?;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    match state
        .api()
        .create_wishlist(Caller::user(&user), &wishlist)
        .await
    {
        Ok(created) => {
            tracing::info!(wishlist_id = %created.id, "Wishlist created");
            store
                .flash_success(format!("Created \"{}\".", created.name))
                .await?;
            Ok(Redirect::to("/wishlists").into_response())
        }
        Err(e) => {
            let message = super::form_failure(e)?;
            let page = render_index(
                &state,
                &store,
                &user,
                form,
                ValidationErrors::default(),
                Some(message),
            )
            .await?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddItemForm {
    pub product_id: ProductId,
    pub return_to: Option<String>,
}

/// Save a product to a wishlist.
#[instrument(skip(state, store, user))]
pub async fn add_item(
    State(state): State<AppState>,
    store: Store,
    RequireAuth(user): RequireAuth,
    Path(id): Path<WishlistId>,
    Form(form): Form<AddItemForm>,
) -> Result<Response, AppError> {
    let back = local_path(
        form.return_to.as_deref(),
        &format!("/products/{}", form.product_id),
    );
    match state
        .api()
        .add_wishlist_item(Caller::user(&user), id, form.product_id)
        .await
    {
        Ok(wishlist) => {
            refresh_badge(&state, &store, &user).await?;
            store
                .flash_success(format!("Saved to \"{}\".", wishlist.name))
                .await?;
        }
        Err(e) => super::flash_failure(&store, e).await?,
    }
    Ok(Redirect::to(&back).into_response())
}

/// Remove a product from a wishlist.
#[instrument(skip(state, store, user))]
pub async fn remove_item(
    State(state): State<AppState>,
    store: Store,
    RequireAuth(user): RequireAuth,
    Path((id, product)): Path<(WishlistId, ProductId)>,
) -> Result<Response, AppError> {
    match state
        .api()
        .remove_wishlist_item(Caller::user(&user), id, product)
        .await
    {
        Ok(()) => refresh_badge(&state, &store, &user).await?,
        Err(e) => super::flash_failure(&store, e).await?,
    }
    Ok(Redirect::to("/wishlists").into_response())
}

/// Ask for confirmation before deleting a wishlist.
#[instrument(skip(store, _user))]
pub async fn confirm_delete(
    store: Store,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<WishlistId>,
) -> Result<Response, AppError> {
    store
        .open_modal(ModalKind::DeleteWishlist, id.to_string())
        .await?;
    Ok(Redirect::to("/wishlists").into_response())
}

/// Delete a wishlist once the dialog for it was confirmed.
#[instrument(skip(state, store, user))]
pub async fn delete(
    State(state): State<AppState>,
    store: Store,
    RequireAuth(user): RequireAuth,
    Path(id): Path<WishlistId>,
) -> Result<Response, AppError> {
    if !store
        .take_modal_if(ModalKind::DeleteWishlist, &id.to_string())
        .await?
    {
        tracing::debug!(wishlist_id = %id, "Delete without matching confirmation ignored");
        return Ok(Redirect::to("/wishlists").into_response());
    }

    match state.api().delete_wishlist(Caller::user(&user), id).await {
        Ok(()) => {
            refresh_badge(&state, &store, &user).await?;
            store.flash_success("Wishlist deleted.").await?;
        }
        Err(e) => super::flash_failure(&store, e).await?,
    }
    Ok(Redirect::to("/wishlists").into_response())
}
