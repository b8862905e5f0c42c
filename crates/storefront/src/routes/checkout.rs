//! Checkout: shipping address, order placement and confirmation.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use emporium_core::OrderId;
use emporium_core::validation::ValidationErrors;
use emporium_core::validation::forms::CheckoutForm;

use crate::api::Caller;
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::routes::cart::CartView;
use crate::state::AppState;
use crate::store::{Chrome, CurrentUser, Store};
use crate::views::OrderDetail;

#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub chrome: Chrome,
    pub cart: CartView,
    pub form: CheckoutForm,
    pub errors: ValidationErrors,
    pub form_error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmation.html")]
pub struct ConfirmationTemplate {
    pub chrome: Chrome,
    pub order: OrderDetail,
}

async fn render(
    state: &AppState,
    store: &Store,
    user: &CurrentUser,
    form: CheckoutForm,
    errors: ValidationErrors,
    form_error: Option<String>,
) -> Result<Response, AppError> {
    let cart = state.api().cart(Caller::user(user)).await?;
    if cart.is_empty() {
        store.flash_error("Your cart is empty.").await?;
        return Ok(Redirect::to("/cart").into_response());
    }
    store.set_cart_count(cart.item_count()).await?;

    let status = if errors.is_empty() && form_error.is_none() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    let page = CheckoutTemplate {
        cart: CartView::from(&cart),
        form,
        errors,
        form_error,
        chrome: store.chrome().await,
    };
    Ok((status, page).into_response())
}

/// Cart summary and shipping address form.
#[instrument(skip(state, store, user))]
pub async fn show(
    State(state): State<AppState>,
    store: Store,
    RequireAuth(user): RequireAuth,
) -> Result<Response, AppError> {
    let form = CheckoutForm {
        full_name: user.name.clone(),
        ..CheckoutForm::default()
    };
    render(&state, &store, &user, form, ValidationErrors::default(), None).await
}

/// Place the order from the current cart.
#[instrument(skip(state, store, user, form))]
pub async fn place(
    State(state): State<AppState>,
    store: Store,
    RequireAuth(user): RequireAuth,
    Form(form): Form<CheckoutForm>,
) -> Result<Response, AppError> {
    let order = match form.validate() {
        Ok(order) => order,
        Err(errors) => return render(&state, &store, &user, form, errors, None).await,
    };

    add_breadcrumb("checkout", "Placing order", None);
    match state.api().place_order(Caller::user(&user), &order).await {
        Ok(placed) => {
            tracing::info!(order_id = %placed.id, total = %placed.total, "Order placed");
            store.set_cart_count(0).await?;
            Ok(Redirect::to(&format!("/checkout/confirmation/{}", placed.id)).into_response())
        }
        Err(e) => {
            let message = super::form_failure(e)?;
            render(
                &state,
                &store,
                &user,
                form,
                ValidationErrors::default(),
                Some(message),
            )
            .await
        }
    }
}

/// The placed order.
#[instrument(skip(state, store, user))]
pub async fn confirmation(
    State(state): State<AppState>,
    store: Store,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<ConfirmationTemplate, AppError> {
    let order = state.api().order(Caller::user(&user), id).await?;
    Ok(ConfirmationTemplate {
        order: OrderDetail::new(&order),
        chrome: store.chrome().await,
    })
}
