//! Authentication and the caller's own profile.

use tracing::instrument;

use emporium_core::models::{AuthSession, User};
use emporium_core::validation::forms::{
    Credentials, PasswordChange, PasswordReset, PasswordResetRequest, ProfileUpdate, Registration,
};

use super::{ApiClient, ApiError, Caller, QueryKey, Resource};

impl ApiClient {
    /// Exchange credentials for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for wrong credentials.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthSession, ApiError> {
        self.post("/auth/login", credentials, Caller::anonymous())
            .await
    }

    /// # Errors
    ///
    /// Returns error if the backend rejects the registration.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<AuthSession, ApiError> {
        self.post("/auth/register", registration, Caller::anonymous())
            .await
    }

    /// # Errors
    ///
    /// Returns error if the backend rejects the request.
    #[instrument(skip(self))]
    pub async fn request_password_reset(
        &self,
        request: &PasswordResetRequest,
    ) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .post("/auth/password-reset", request, Caller::anonymous())
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns error if the token is invalid or expired.
    #[instrument(skip(self, reset))]
    pub async fn reset_password(&self, reset: &PasswordReset) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .post("/auth/password-reset/confirm", reset, Caller::anonymous())
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns error if the request fails after retries.
    #[instrument(skip(self))]
    pub async fn me(&self, caller: Caller<'_>) -> Result<User, ApiError> {
        let key = QueryKey::list(Resource::Profile, "").scoped(caller.scope());
        self.query(key, "/users/me", &Vec::new(), caller).await
    }

    /// Update name/email; the cached profile is replaced with the response.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the update.
    #[instrument(skip(self))]
    pub async fn update_profile(
        &self,
        caller: Caller<'_>,
        update: &ProfileUpdate,
    ) -> Result<User, ApiError> {
        let user: User = self.patch("/users/me", update, caller).await?;
        self.cache()
            .set(
                QueryKey::list(Resource::Profile, "").scoped(caller.scope()),
                &user,
            )
            .await;
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns error if the current password is wrong.
    #[instrument(skip(self, change))]
    pub async fn change_password(
        &self,
        caller: Caller<'_>,
        change: &PasswordChange,
    ) -> Result<(), ApiError> {
        let _: serde_json::Value = self.post("/users/me/password", change, caller).await?;
        Ok(())
    }
}
