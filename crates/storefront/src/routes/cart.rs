//! Cart route handlers.
//!
//! Every change re-reads the cart the backend returned and refreshes the
//! header badge from it.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use emporium_core::models::cart::clamp_quantity;
use emporium_core::models::{Cart, CartLine};
use emporium_core::{CartLineId, ProductId};

use crate::api::Caller;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::state::AppState;
use crate::store::{Chrome, Store};
use crate::views::local_path;

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: String,
    pub quantity: u32,
    pub line_total: String,
    pub image_url: Option<String>,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            id: line.id,
            product_id: line.product_id,
            name: line.product_name.clone(),
            unit_price: line.unit_price.to_string(),
            quantity: line.quantity,
            line_total: line.line_total().to_string(),
            image_url: line.image_url.clone(),
        }
    }
}

/// Cart display data for templates. Totals are computed from the same lines
/// that are rendered.
#[derive(Debug, Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: u32,
    pub subtotal: String,
    pub shipping: String,
    pub free_shipping: bool,
    pub total: String,
    pub remaining_for_free_shipping: Option<String>,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        let shipping = cart.shipping();
        Self {
            lines: cart.lines.iter().map(CartLineView::from).collect(),
            item_count: cart.item_count(),
            subtotal: cart.subtotal().to_string(),
            free_shipping: shipping.is_zero(),
            shipping: shipping.to_string(),
            total: cart.total().to_string(),
            remaining_for_free_shipping: cart
                .remaining_for_free_shipping()
                .map(|m| m.to_string()),
        }
    }
}

impl CartView {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartTemplate {
    pub chrome: Chrome,
    pub cart: CartView,
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
    pub return_to: Option<String>,
}

/// Update quantity form data. Zero removes the line.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub line_id: CartLineId,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub line_id: CartLineId,
}

/// Display cart page.
#[instrument(skip(state, store, user))]
pub async fn show(
    State(state): State<AppState>,
    store: Store,
    RequireAuth(user): RequireAuth,
) -> Result<CartTemplate, AppError> {
    let cart = state.api().cart(Caller::user(&user)).await?;
    store.set_cart_count(cart.item_count()).await?;

    Ok(CartTemplate {
        cart: CartView::from(&cart),
        chrome: store.chrome().await,
    })
}

/// Add a product to the cart.
#[instrument(skip(state, store, user))]
pub async fn add(
    State(state): State<AppState>,
    store: Store,
    RequireAuth(user): RequireAuth,
    Form(form): Form<AddToCartForm>,
) -> Result<Response, AppError> {
    let quantity = clamp_quantity(form.quantity.unwrap_or(1)).unwrap_or(1);
    let back = local_path(form.return_to.as_deref(), "/cart");

    match state
        .api()
        .add_to_cart(Caller::user(&user), form.product_id, quantity)
        .await
    {
        Ok(cart) => {
            store.set_cart_count(cart.item_count()).await?;
            store.flash_success("Added to cart.").await?;
        }
        Err(e) => super::flash_failure(&store, e).await?,
    }
    Ok(Redirect::to(&back).into_response())
}

/// Change a line's quantity, clamped to the allowed range.
#[instrument(skip(state, store, user))]
pub async fn update(
    State(state): State<AppState>,
    store: Store,
    RequireAuth(user): RequireAuth,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response, AppError> {
    let caller = Caller::user(&user);
    let result = match clamp_quantity(form.quantity) {
        Some(quantity) => state
            .api()
            .update_cart_line(caller, form.line_id, quantity)
            .await
            .map(|cart| cart.item_count()),
        None => match state.api().remove_cart_line(caller, form.line_id).await {
            Ok(()) => state.api().cart(caller).await.map(|cart| cart.item_count()),
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(count) => store.set_cart_count(count).await?,
        Err(e) => super::flash_failure(&store, e).await?,
    }
    Ok(Redirect::to("/cart").into_response())
}

/// Remove a line from the cart.
#[instrument(skip(state, store, user))]
pub async fn remove(
    State(state): State<AppState>,
    store: Store,
    RequireAuth(user): RequireAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response, AppError> {
    let caller = Caller::user(&user);
    match state.api().remove_cart_line(caller, form.line_id).await {
        Ok(()) => {
            let cart = state.api().cart(caller).await?;
            store.set_cart_count(cart.item_count()).await?;
        }
        Err(e) => super::flash_failure(&store, e).await?,
    }
    Ok(Redirect::to("/cart").into_response())
}

/// Empty the cart.
#[instrument(skip(state, store, user))]
pub async fn clear(
    State(state): State<AppState>,
    store: Store,
    RequireAuth(user): RequireAuth,
) -> Result<Response, AppError> {
    match state.api().clear_cart(Caller::user(&user)).await {
        Ok(()) => {
            store.set_cart_count(0).await?;
            store.flash_success("Your cart is empty.").await?;
        }
        Err(e) => super::flash_failure(&store, e).await?,
    }
    Ok(Redirect::to("/cart").into_response())
}

#[cfg(test)]
mod tests {
    use emporium_core::Money;

    use super::*;

    fn line(id: i64, cents: i64, quantity: u32) -> CartLine {
        CartLine {
            id: CartLineId::new(id),
            product_id: ProductId::new(id),
            product_name: format!("Item {id}"),
            unit_price: Money::from_cents(cents),
            quantity,
            image_url: None,
        }
    }

    #[test]
    fn test_view_totals_match_lines() {
        let cart = Cart {
            lines: vec![line(1, 1250, 2), line(2, 399, 3)],
        };
        let view = CartView::from(&cart);
        assert_eq!(view.lines[0].line_total, "$25.00");
        assert_eq!(view.lines[1].line_total, "$11.97");
        assert_eq!(view.subtotal, "$36.97");
        assert_eq!(view.shipping, "$5.00");
        assert_eq!(view.total, "$41.97");
        assert_eq!(view.remaining_for_free_shipping.as_deref(), Some("$13.03"));
        assert_eq!(view.item_count, 5);
    }

    #[test]
    fn test_free_shipping_over_threshold() {
        let cart = Cart {
            lines: vec![line(1, 6000, 1)],
        };
        let view = CartView::from(&cart);
        assert!(view.free_shipping);
        assert_eq!(view.total, "$60.00");
        assert!(view.remaining_for_free_shipping.is_none());
    }
}
