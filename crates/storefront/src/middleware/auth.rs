//! Authentication extractors.
//!
//! Roles come from the signed-in user stored in the session:
//! - [`RequireAuth`]: any signed-in user
//! - [`RequireVendor`]: vendors and admins
//! - [`RequireAdmin`]: admins only

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::store::{CurrentUser, keys};

/// Error returned when a page needs a signed-in user with a given role.
pub enum AuthRejection {
    /// Not signed in.
    RedirectToLogin,
    /// Signed in with the wrong role.
    Forbidden,
    /// The session layer is missing.
    NoSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Forbidden => {
                (StatusCode::FORBIDDEN, "You don't have access to this page.").into_response()
            }
            Self::NoSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

async fn session_user(parts: &Parts) -> Result<Option<CurrentUser>, AuthRejection> {
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AuthRejection::NoSession)?;

    Ok(session
        .get::<CurrentUser>(keys::CURRENT_USER)
        .await
        .ok()
        .flatten())
}

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_user(parts)
            .await?
            .map(Self)
            .ok_or(AuthRejection::RedirectToLogin)
    }
}

/// Extractor that optionally gets the current user.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await.ok().flatten()))
    }
}

/// Extractor for the vendor console. Admins pass too.
pub struct RequireVendor(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireVendor
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = session_user(parts)
            .await?
            .ok_or(AuthRejection::RedirectToLogin)?;
        if !user.is_vendor() {
            tracing::debug!(user_id = %user.id, "Vendor page refused");
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

/// Extractor for the admin console.
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = session_user(parts)
            .await?
            .ok_or(AuthRejection::RedirectToLogin)?;
        if !user.is_admin() {
            tracing::debug!(user_id = %user.id, "Admin page refused");
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}
