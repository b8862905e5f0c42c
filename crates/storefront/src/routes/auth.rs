//! Authentication route handlers.
//!
//! Login, registration, logout and the password reset flow. The backend
//! issues a bearer token on login; it lives in the session with the user.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use emporium_core::UserRole;
use emporium_core::models::AuthSession;
use emporium_core::models::notification::unread_count;
use emporium_core::validation::ValidationErrors;
use emporium_core::validation::forms::{
    LoginForm, PasswordResetForm, PasswordResetRequestForm, RegisterForm,
};

use crate::api::{ApiError, Caller};
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::state::AppState;
use crate::store::{Chrome, CurrentUser, Store};
use crate::views::local_path;

const INVALID_CREDENTIALS: &str = "Invalid email or password.";

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub chrome: Chrome,
    pub email: String,
    pub next: String,
    pub notice: Option<&'static str>,
    pub errors: ValidationErrors,
    pub form_error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub chrome: Chrome,
    pub name: String,
    pub email: String,
    pub errors: ValidationErrors,
    pub form_error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_request.html")]
pub struct ResetRequestTemplate {
    pub chrome: Chrome,
    pub email: String,
    pub sent: bool,
    pub errors: ValidationErrors,
    pub form_error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/reset.html")]
pub struct ResetTemplate {
    pub chrome: Chrome,
    pub token: String,
    pub errors: ValidationErrors,
    pub form_error: Option<String>,
}

// =============================================================================
// Helpers
// =============================================================================

/// Where a freshly signed-in user lands.
fn landing_page(role: UserRole, next: Option<&str>) -> String {
    match role {
        UserRole::Admin => "/admin".to_string(),
        UserRole::Vendor => "/vendor".to_string(),
        UserRole::Customer => local_path(next, "/"),
    }
}

/// Fill the header badges. Failures only leave a badge at zero.
async fn prime_badges(state: &AppState, store: &Store, user: &CurrentUser) -> Result<(), AppError> {
    let caller = Caller::user(user);

    match state.api().cart(caller).await {
        Ok(cart) => store.set_cart_count(cart.item_count()).await?,
        Err(e) => tracing::warn!(error = %e, "Could not load cart badge"),
    }
    match state.api().wishlists(caller).await {
        Ok(wishlists) => super::wishlists::sync_badge(store, &wishlists).await?,
        Err(e) => tracing::warn!(error = %e, "Could not load wishlist hearts"),
    }
    match state.api().notifications(caller).await {
        Ok(notifications) => store.set_unread(unread_count(&notifications)).await?,
        Err(e) => tracing::warn!(error = %e, "Could not load notification badge"),
    }
    Ok(())
}

async fn start_session(
    state: &AppState,
    store: &Store,
    auth: AuthSession,
) -> Result<CurrentUser, AppError> {
    let user = CurrentUser::new(&auth.user, auth.token);
    store.sign_in(&user).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    prime_badges(state, store, &user).await?;
    tracing::info!(user_id = %user.id, role = %user.role, "Signed in");
    Ok(user)
}

// =============================================================================
// Login
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub expired: Option<String>,
    pub next: Option<String>,
}

/// Display the login page.
#[instrument(skip(store))]
pub async fn login_page(store: Store, Query(query): Query<LoginQuery>) -> Response {
    if query.expired.is_none()
        && let Some(user) = store.current_user().await
    {
        return Redirect::to(&landing_page(user.role, query.next.as_deref())).into_response();
    }

    LoginTemplate {
        email: String::new(),
        next: local_path(query.next.as_deref(), ""),
        notice: query
            .expired
            .is_some()
            .then_some("Your session has expired. Please sign in again."),
        errors: ValidationErrors::default(),
        form_error: None,
        chrome: store.chrome().await,
    }
    .into_response()
}

#[derive(Deserialize)]
pub struct LoginSubmission {
    #[serde(flatten)]
    pub form: LoginForm,
    pub next: Option<String>,
}

/// Handle login form submission.
#[instrument(skip(state, store, submission))]
pub async fn login(
    State(state): State<AppState>,
    store: Store,
    Form(submission): Form<LoginSubmission>,
) -> Result<Response, AppError> {
    let LoginSubmission { form, next } = submission;
    let render = |errors: ValidationErrors, form_error: Option<String>, chrome: Chrome| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            LoginTemplate {
                email: form.email.clone(),
                next: local_path(next.as_deref(), ""),
                notice: None,
                errors,
                form_error,
                chrome,
            },
        )
            .into_response()
    };

    let credentials = match form.validate() {
        Ok(credentials) => credentials,
        Err(errors) => return Ok(render(errors, None, store.chrome().await)),
    };

    match state.api().login(&credentials).await {
        Ok(auth) => {
            let user = start_session(&state, &store, auth).await?;
            Ok(Redirect::to(&landing_page(user.role, next.as_deref())).into_response())
        }
        Err(ApiError::Unauthorized) => {
            tracing::info!("Login rejected");
            Ok(render(
                ValidationErrors::default(),
                Some(INVALID_CREDENTIALS.to_string()),
                store.chrome().await,
            ))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            Ok(render(
                ValidationErrors::default(),
                Some(e.user_message()),
                store.chrome().await,
            ))
        }
    }
}

// =============================================================================
// Registration
// =============================================================================

/// Display the registration page.
#[instrument(skip(store))]
pub async fn register_page(store: Store) -> RegisterTemplate {
    RegisterTemplate {
        name: String::new(),
        email: String::new(),
        errors: ValidationErrors::default(),
        form_error: None,
        chrome: store.chrome().await,
    }
}

/// Handle registration form submission.
#[instrument(skip(state, store, form))]
pub async fn register(
    State(state): State<AppState>,
    store: Store,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let failed = |errors: ValidationErrors, form_error: Option<String>, chrome: Chrome| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            RegisterTemplate {
                name: form.name.clone(),
                email: form.email.clone(),
                errors,
                form_error,
                chrome,
            },
        )
            .into_response()
    };

    let registration = match form.validate() {
        Ok(registration) => registration,
        Err(errors) => return Ok(failed(errors, None, store.chrome().await)),
    };

    match state.api().register(&registration).await {
        Ok(auth) => {
            let user = start_session(&state, &store, auth).await?;
            store
                .flash_success(format!("Welcome to Emporium, {}!", user.name))
                .await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Registration failed");
            Ok(failed(
                ValidationErrors::default(),
                Some(e.user_message()),
                store.chrome().await,
            ))
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Sign out and forget every user-scoped value in the store.
#[instrument(skip(store))]
pub async fn logout(store: Store) -> Result<Response, AppError> {
    if let Some(user) = store.current_user().await {
        tracing::info!(user_id = %user.id, "Signed out");
    }
    store.sign_out().await?;
    clear_sentry_user();
    store.flash_success("You have been signed out.").await?;
    Ok(Redirect::to("/").into_response())
}

// =============================================================================
// Password reset
// =============================================================================

/// Display the "forgot password" form.
#[instrument(skip(store))]
pub async fn reset_request_page(store: Store) -> ResetRequestTemplate {
    ResetRequestTemplate {
        email: String::new(),
        sent: false,
        errors: ValidationErrors::default(),
        form_error: None,
        chrome: store.chrome().await,
    }
}

/// Ask the backend to email a reset link.
///
/// The confirmation does not reveal whether the address has an account.
#[instrument(skip(state, store, form))]
pub async fn request_reset(
    State(state): State<AppState>,
    store: Store,
    Form(form): Form<PasswordResetRequestForm>,
) -> Result<Response, AppError> {
    let request = match form.validate() {
        Ok(request) => request,
        Err(errors) => {
            let page = ResetRequestTemplate {
                email: form.email.clone(),
                sent: false,
                errors,
                form_error: None,
                chrome: store.chrome().await,
            };
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let (sent, form_error) = match state.api().request_password_reset(&request).await {
        Ok(()) | Err(ApiError::NotFound { .. }) => (true, None),
        Err(e) => {
            tracing::warn!(error = %e, "Password reset request failed");
            (false, Some(e.user_message()))
        }
    };

    let page = ResetRequestTemplate {
        email: form.email.clone(),
        sent,
        errors: ValidationErrors::default(),
        form_error,
        chrome: store.chrome().await,
    };
    Ok(page.into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetQuery {
    pub token: Option<String>,
}

/// Display the new-password form for a reset token.
#[instrument(skip(store, query))]
pub async fn reset_page(store: Store, Query(query): Query<ResetQuery>) -> ResetTemplate {
    ResetTemplate {
        token: query.token.unwrap_or_default(),
        errors: ValidationErrors::default(),
        form_error: None,
        chrome: store.chrome().await,
    }
}

/// Set a new password with a reset token.
#[instrument(skip(state, store, form))]
pub async fn reset_password(
    State(state): State<AppState>,
    store: Store,
    Form(form): Form<PasswordResetForm>,
) -> Result<Response, AppError> {
    let failed = |errors: ValidationErrors, form_error: Option<String>, chrome: Chrome| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            ResetTemplate {
                token: form.token.clone(),
                errors,
                form_error,
                chrome,
            },
        )
            .into_response()
    };

    let reset = match form.validate() {
        Ok(reset) => reset,
        Err(errors) => return Ok(failed(errors, None, store.chrome().await)),
    };

    match state.api().reset_password(&reset).await {
        Ok(()) => {
            store
                .flash_success("Password updated. Please sign in.")
                .await?;
            Ok(Redirect::to("/auth/login").into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Password reset rejected");
            Ok(failed(
                ValidationErrors::default(),
                Some(e.user_message()),
                store.chrome().await,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landing_page_by_role() {
        assert_eq!(landing_page(UserRole::Admin, Some("/cart")), "/admin");
        assert_eq!(landing_page(UserRole::Vendor, None), "/vendor");
        assert_eq!(landing_page(UserRole::Customer, Some("/cart")), "/cart");
        assert_eq!(
            landing_page(UserRole::Customer, Some("https://evil.example")),
            "/"
        );
    }
}
