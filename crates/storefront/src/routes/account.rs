//! Account route handlers: profile, password and order history.

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

use emporium_core::pagination::PageRequest;
use emporium_core::validation::ValidationErrors;
use emporium_core::validation::forms::{PasswordChangeForm, ProfileForm};
use emporium_core::{OrderId, OrderStatus};

use crate::api::{Caller, OrderQuery};
use crate::error::{AppError, set_sentry_user};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::state::AppState;
use crate::store::{Chrome, CurrentUser, ModalKind, Store};
use crate::views::{OrderDetail, OrderRow, Pager, SelectOption};

const ORDERS_PER_PAGE: u32 = 10;

#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub chrome: Chrome,
    pub member_since: String,
    pub profile: ProfileForm,
    pub profile_errors: ValidationErrors,
    pub profile_error: Option<String>,
    pub password_errors: ValidationErrors,
    pub password_error: Option<String>,
}

/// Which of the two forms on the profile page failed.
enum Failed {
    Nothing,
    Profile(ValidationErrors, Option<String>),
    Password(ValidationErrors, Option<String>),
}

async fn render_profile(
    state: &AppState,
    store: &Store,
    user: &CurrentUser,
    profile: Option<ProfileForm>,
    failed: Failed,
) -> Result<Response, AppError> {
    let me = state.api().me(Caller::user(user)).await?;
    let profile = profile.unwrap_or_else(|| ProfileForm {
        name: me.name.clone(),
        email: me.email.to_string(),
    });

    let (status, profile_errors, profile_error, password_errors, password_error) = match failed {
        Failed::Nothing => (
            StatusCode::OK,
            ValidationErrors::default(),
            None,
            ValidationErrors::default(),
            None,
        ),
        Failed::Profile(errors, message) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            errors,
            message,
            ValidationErrors::default(),
            None,
        ),
        Failed::Password(errors, message) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ValidationErrors::default(),
            None,
            errors,
            message,
        ),
    };

    let page = ProfileTemplate {
        member_since: me.created_at.format("%B %Y").to_string(),
        profile,
        profile_errors,
        profile_error,
        password_errors,
        password_error,
        chrome: store.chrome().await,
    };
    Ok((status, page).into_response())
}

/// Profile and password forms.
#[instrument(skip(state, store, user))]
pub async fn profile(
    State(state): State<AppState>,
    store: Store,
    RequireAuth(user): RequireAuth,
) -> Result<Response, AppError> {
    render_profile(&state, &store, &user, None, Failed::Nothing).await
}

/// Save name and email.
#[instrument(skip(state, store, user))]
pub async fn update_profile(
    State(state): State<AppState>,
    store: Store,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Result<Response, AppError> {
    let update = match form.validate() {
        Ok(update) => update,
        Err(errors) => {
            return render_profile(&state, &store, &user, Some(form), Failed::Profile(errors, None))
                .await;
        }
    };

    match state.api().update_profile(Caller::user(&user), &update).await {
        Ok(updated) => {
            let refreshed = CurrentUser::new(&updated, user.token.clone());
            store.refresh_user(&refreshed).await?;
            set_sentry_user(&updated.id, Some(updated.email.as_str()));
            store.flash_success("Profile saved.").await?;
            Ok(Redirect::to("/account").into_response())
        }
        Err(e) => {
            let message = super::form_failure(e)?;
            render_profile(
                &state,
                &store,
                &user,
                Some(form),
                Failed::Profile(ValidationErrors::default(), Some(message)),
            )
            .await
        }
    }
}

/// Change the password. The current password is checked by the backend.
#[instrument(skip(state, store, user, form))]
pub async fn change_password(
    State(state): State<AppState>,
    store: Store,
    RequireAuth(user): RequireAuth,
    Form(form): Form<PasswordChangeForm>,
) -> Result<Response, AppError> {
    let change = match form.validate() {
        Ok(change) => change,
        Err(errors) => {
            return render_profile(&state, &store, &user, None, Failed::Password(errors, None))
                .await;
        }
    };

    match state.api().change_password(Caller::user(&user), &change).await {
        Ok(()) => {
            tracing::info!(user_id = %user.id, "Password changed");
            store.flash_success("Password changed.").await?;
            Ok(Redirect::to("/account").into_response())
        }
        Err(e) => {
            let message = super::form_failure(e)?;
            render_profile(
                &state,
                &store,
                &user,
                None,
                Failed::Password(ValidationErrors::default(), Some(message)),
            )
            .await
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderListParams {
    pub status: Option<String>,
    pub page: Option<String>,
}

impl OrderListParams {
    pub(crate) fn status(&self) -> Option<OrderStatus> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }

    pub(crate) fn page(&self) -> Option<u32> {
        self.page.as_deref().and_then(|p| p.trim().parse().ok())
    }
}

/// Status filter options with an "All" entry.
pub(crate) fn status_filter(current: Option<OrderStatus>) -> Vec<SelectOption> {
    let current = current.map_or("", OrderStatus::as_str);
    let mut options = vec![SelectOption::any("All statuses", current)];
    options.extend(
        OrderStatus::ALL
            .into_iter()
            .map(|s| SelectOption::new(s.as_str(), s.label(), current)),
    );
    options
}

#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub chrome: Chrome,
    pub orders: Vec<OrderRow>,
    pub pager: Pager,
    pub statuses: Vec<SelectOption>,
}

/// Order history.
#[instrument(skip(state, store, user))]
pub async fn orders(
    State(state): State<AppState>,
    store: Store,
    RequireAuth(user): RequireAuth,
    Query(params): Query<OrderListParams>,
) -> Result<OrdersTemplate, AppError> {
    let status = params.status();
    let query = OrderQuery {
        page: PageRequest::new(params.page(), Some(ORDERS_PER_PAGE)),
        status,
    };
    let page = state.api().orders(Caller::user(&user), &query).await?;
    let pager = Pager::new(
        &page,
        "/account/orders",
        &[("status", status.map_or_else(String::new, |s| s.as_str().to_string()))],
    );

    Ok(OrdersTemplate {
        orders: page.items.iter().map(|o| OrderRow::new(o, false)).collect(),
        pager,
        statuses: status_filter(status),
        chrome: store.chrome().await,
    })
}

#[derive(Template, WebTemplate)]
#[template(path = "account/order.html")]
pub struct OrderTemplate {
    pub chrome: Chrome,
    pub order: OrderDetail,
}

/// One order with its items.
#[instrument(skip(state, store, user))]
pub async fn order(
    State(state): State<AppState>,
    store: Store,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<OrderTemplate, AppError> {
    let order = state.api().order(Caller::user(&user), id).await?;
    Ok(OrderTemplate {
        order: OrderDetail::new(&order),
        chrome: store.chrome().await,
    })
}

/// Ask for confirmation before cancelling.
#[instrument(skip(store, _user))]
pub async fn confirm_cancel(
    store: Store,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Response, AppError> {
    store
        .open_modal(ModalKind::CancelOrder, id.to_string())
        .await?;
    Ok(Redirect::to(&format!("/account/orders/{id}")).into_response())
}

/// Cancel the order once the dialog for it was confirmed.
#[instrument(skip(state, store, user))]
pub async fn cancel(
    State(state): State<AppState>,
    store: Store,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Response, AppError> {
    let back = format!("/account/orders/{id}");
    if !store
        .take_modal_if(ModalKind::CancelOrder, &id.to_string())
        .await?
    {
        return Ok(Redirect::to(&back).into_response());
    }

    match state
        .api()
        .update_order_status(Caller::user(&user), id, OrderStatus::Cancelled)
        .await
    {
        Ok(order) => {
            tracing::info!(order_id = %order.id, "Order cancelled by customer");
            store.flash_success(format!("Order #{id} cancelled.")).await?;
        }
        Err(e) => super::flash_failure(&store, e).await?,
    }
    Ok(Redirect::to(&back).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_params_ignore_unknown_status() {
        let params = OrderListParams {
            status: Some("lost".to_string()),
            page: Some("2".to_string()),
        };
        assert_eq!(params.status(), None);
        assert_eq!(params.page(), Some(2));
    }

    #[test]
    fn test_status_filter_marks_current() {
        let options = status_filter(Some(OrderStatus::Shipped));
        assert_eq!(options.len(), OrderStatus::ALL.len() + 1);
        let selected: Vec<&str> = options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.value.as_str())
            .collect();
        assert_eq!(selected, vec!["shipped"]);
    }
}
