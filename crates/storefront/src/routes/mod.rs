//! HTTP route handlers for the storefront and console.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                   - Home page
//! GET  /health, /health/ready              - Liveness / readiness
//!
//! # Shop
//! GET  /products                           - Catalog (q, category, sort, min_rating, in_stock, page)
//! GET  /products/{id}                      - Product detail with reviews
//! POST /products/{id}/reviews              - Submit a review
//!
//! # Cart & checkout (requires auth)
//! GET  /cart                               - Cart page
//! POST /cart/add | /cart/update | /cart/remove | /cart/clear
//! GET  /checkout, POST /checkout           - Address form, place order
//! GET  /checkout/confirmation/{id}         - Placed order
//!
//! # Wishlists (requires auth)
//! GET  /wishlists, POST /wishlists
//! POST /wishlists/{id}/items               - Save a product
//! POST /wishlists/{id}/items/{product}/remove
//! POST /wishlists/{id}/delete[/confirm]    - Confirmation modal, then delete
//!
//! # Account (requires auth)
//! GET  /account                            - Profile and password forms
//! POST /account/profile | /account/password
//! GET  /account/orders[/{id}]
//! POST /account/orders/{id}/cancel[/confirm]
//! GET  /notifications, POST /notifications/{id}/read, POST /notifications/read-all
//!
//! # Auth
//! GET/POST /auth/login | /auth/register | /auth/password-reset | /auth/password-reset/confirm
//! POST /auth/logout
//!
//! # Vendor console (vendors and admins)
//! GET  /vendor                             - Sales dashboard
//! /vendor/products[...]                    - Own product CRUD
//! GET  /vendor/orders, POST /vendor/orders/{id}/status
//!
//! # Admin console (admins)
//! GET  /admin                              - Analytics dashboard
//! /admin/users[...]                        - Filters, selection, bulk block/unblock/delete, roles
//! /admin/orders[...]                       - Selection, bulk status
//! /admin/reviews[...]                      - Selection, bulk approve/reject/delete
//! /admin/categories[...], GET /admin/vendors
//!
//! POST /modal/dismiss                      - Close the confirmation modal
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod modal;
pub mod notifications;
pub mod shop;
pub mod vendor;
pub mod wishlists;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::api::ApiError;
use crate::error::AppError;
use crate::state::AppState;
use crate::store::Store;

/// Report a failed mutation in the flash banner.
///
/// A rejected token is still an error so the visitor is signed out.
pub(crate) async fn flash_failure(store: &Store, error: ApiError) -> Result<(), AppError> {
    if matches!(error, ApiError::Unauthorized) {
        return Err(error.into());
    }
    if error.is_server_error() {
        tracing::error!(error = %error, "Backend mutation failed");
    } else {
        tracing::warn!(error = %error, "Backend rejected mutation");
    }
    store.flash_error(error.user_message()).await?;
    Ok(())
}

/// Banner text for a backend error on a form submission.
///
/// A rejected token is passed through so the visitor is signed out.
pub(crate) fn form_failure(error: ApiError) -> Result<String, AppError> {
    match error {
        ApiError::Unauthorized => Err(error.into()),
        other => {
            tracing::warn!(error = %other, "Form submission rejected");
            Ok(other.user_message())
        }
    }
}

/// Liveness check. Does not touch the backend.
async fn health() -> &'static str {
    "ok"
}

/// Readiness check: 503 until the REST backend answers.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.api().health().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(shop::catalog))
        .route("/{id}", get(shop::product))
        .route("/{id}/reviews", post(shop::submit_review))
}

fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::place))
        .route("/confirmation/{id}", get(checkout::confirmation))
}

fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlists::index).post(wishlists::create))
        .route("/{id}/items", post(wishlists::add_item))
        .route("/{id}/items/{product}/remove", post(wishlists::remove_item))
        .route("/{id}/delete", post(wishlists::confirm_delete))
        .route("/{id}/delete/confirm", post(wishlists::delete))
}

fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::profile))
        .route("/profile", post(account::update_profile))
        .route("/password", post(account::change_password))
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order))
        .route("/orders/{id}/cancel", post(account::confirm_cancel))
        .route("/orders/{id}/cancel/confirm", post(account::cancel))
}

fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::index))
        .route("/read-all", post(notifications::mark_all_read))
        .route("/{id}/read", post(notifications::mark_read))
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .route(
            "/password-reset",
            get(auth::reset_request_page).post(auth::request_reset),
        )
        .route(
            "/password-reset/confirm",
            get(auth::reset_page).post(auth::reset_password),
        )
}

/// Create all routes for the storefront and console.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(shop::home))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/modal/dismiss", post(modal::dismiss))
        .nest("/products", shop_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/wishlists", wishlist_routes())
        .nest("/account", account_routes())
        .nest("/notifications", notification_routes())
        .nest("/auth", auth_routes())
        .nest("/vendor", vendor::routes())
        .nest("/admin", admin::routes())
}
