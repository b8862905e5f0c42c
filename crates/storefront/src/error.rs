//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server-side failures are
//! captured to Sentry; every error renders the error page with a message the
//! visitor can act on and a "Retry" link back to the same URL. A `401` from
//! the backend redirects to login instead and marks the response so the
//! session middleware forgets the stale token.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::api::{ApiError, GENERIC_ERROR_MESSAGE};
use crate::filters;
use crate::store::Chrome;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// REST backend call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Session store read or write failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Signed in, but the role does not allow this page.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Response extension set when the backend rejected the stored token.
#[derive(Debug, Clone, Copy)]
pub struct SessionExpired;

/// Where a visitor with an expired token is sent.
pub const LOGIN_EXPIRED_PATH: &str = "/auth/login?expired=1";

#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub chrome: Chrome,
    pub status: u16,
    pub title: &'static str,
    pub message: String,
}

impl AppError {
    fn is_server_error(&self) -> bool {
        match self {
            Self::Api(e) => e.is_server_error(),
            Self::Session(_) | Self::Internal(_) => true,
            Self::NotFound(_) | Self::Forbidden(_) | Self::BadRequest(_) => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Api(ApiError::NotFound { .. }) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Api(ApiError::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
            Self::Api(ApiError::Unauthorized) => StatusCode::UNAUTHORIZED,
            Self::Api(ApiError::Transition { .. }) => StatusCode::CONFLICT,
            Self::Api(ApiError::Api { status, .. }) if (400..500).contains(status) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
            }
            Self::Api(_) => StatusCode::BAD_GATEWAY,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown in the error banner.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e.user_message(),
            Self::NotFound(_) => "We couldn't find what you were looking for.".to_string(),
            Self::Forbidden(_) => "You don't have access to this page.".to_string(),
            Self::BadRequest(message) => message.clone(),
            Self::Session(_) | Self::Internal(_) => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }

    const fn title(&self) -> &'static str {
        match self {
            Self::Api(ApiError::NotFound { .. }) | Self::NotFound(_) => "Not found",
            Self::Forbidden(_) => "Access denied",
            Self::BadRequest(_)
            | Self::Api(ApiError::Api { .. } | ApiError::Transition { .. }) => "Request failed",
            _ => "Something went wrong",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Api(ApiError::Unauthorized)) {
            tracing::info!("Backend rejected stored token, signing out");
            let mut response = Redirect::to(LOGIN_EXPIRED_PATH).into_response();
            response.extensions_mut().insert(SessionExpired);
            return response;
        }

        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let status = self.status();
        let page = ErrorTemplate {
            chrome: Chrome::default(),
            status: status.as_u16(),
            title: self.title(),
            message: self.user_message(),
        };
        (status, page).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context after sign-in.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context on sign-out.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use axum::http::header::LOCATION;

    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product 123".to_string());
        assert_eq!(err.to_string(), "Not found: product 123");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            status_of(AppError::NotFound("x".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Forbidden("x".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(AppError::Api(ApiError::Api {
                status: 422,
                message: Some("Out of stock".to_string()),
            })),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(AppError::Api(ApiError::Api {
                status: 503,
                message: None,
            })),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(AppError::Internal("x".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unauthorized_redirects_to_login_and_marks_expiry() {
        let response = AppError::Api(ApiError::Unauthorized).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).map(|v| v.as_bytes()),
            Some(LOGIN_EXPIRED_PATH.as_bytes())
        );
        assert!(response.extensions().get::<SessionExpired>().is_some());
    }

    #[test]
    fn test_backend_message_is_shown_verbatim() {
        let err = AppError::Api(ApiError::Api {
            status: 409,
            message: Some("Wishlist name already taken".to_string()),
        });
        assert_eq!(err.user_message(), "Wishlist name already taken");

        let err = AppError::Api(ApiError::Parse("bad json".to_string()));
        assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);
    }
}
