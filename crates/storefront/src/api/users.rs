//! User administration endpoints.

use tracing::instrument;

use emporium_core::models::User;
use emporium_core::pagination::{Page, PageRequest};
use emporium_core::validation::forms::UserUpdate;
use emporium_core::{UserId, UserRole, UserStatus};

use super::{ApiClient, ApiError, Caller, Invalidation, Params, QueryKey, Resource, params_key};

#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub page: PageRequest,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub q: Option<String>,
}

impl UserQuery {
    fn params(&self) -> Params {
        let mut params = vec![
            ("page", self.page.page().to_string()),
            ("per_page", self.page.per_page().to_string()),
        ];
        if let Some(role) = self.role {
            params.push(("role", role.as_str().to_string()));
        }
        if let Some(status) = self.status {
            params.push(("status", status.as_str().to_string()));
        }
        if let Some(q) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            params.push(("q", q.to_string()));
        }
        params
    }
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns error if the request fails after retries.
    #[instrument(skip(self))]
    pub async fn users(&self, caller: Caller<'_>, query: &UserQuery) -> Result<Page<User>, ApiError> {
        let params = query.params();
        let key = QueryKey::list(Resource::Users, params_key(&params)).scoped(caller.scope());
        self.query(key, "/users", &params, caller).await
    }

    /// Change a user's role or block state.
    ///
    /// Does not touch the cache; callers invalidate once they are done.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the update.
    #[instrument(skip(self))]
    pub async fn update_user(
        &self,
        caller: Caller<'_>,
        id: UserId,
        update: &UserUpdate,
    ) -> Result<User, ApiError> {
        self.patch(&format!("/users/{id}"), update, caller).await
    }

    /// # Errors
    ///
    /// Returns error if the backend refuses the delete.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, caller: Caller<'_>, id: UserId) -> Result<(), ApiError> {
        self.delete(&format!("/users/{id}"), caller).await
    }

    /// Patch a changed user into every cached user list page.
    pub async fn apply_user_update(&self, user: &User) -> usize {
        let Ok(updated) = serde_json::to_value(user) else {
            self.invalidate_users().await;
            return 0;
        };
        let id = serde_json::Value::from(user.id.as_i64());
        self.cache()
            .patch_entries(Resource::Users, |page| {
                let Some(items) = page.get_mut("items").and_then(serde_json::Value::as_array_mut)
                else {
                    return false;
                };
                let mut changed = false;
                for item in items.iter_mut().filter(|item| item.get("id") == Some(&id)) {
                    *item = updated.clone();
                    changed = true;
                }
                changed
            })
            .await
    }

    pub async fn invalidate_users(&self) {
        self.cache()
            .invalidate(Invalidation::Resource(Resource::Users))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_include_filters() {
        let query = UserQuery {
            page: PageRequest::default(),
            role: Some(UserRole::Vendor),
            status: Some(UserStatus::Blocked),
            q: Some(" ada ".to_string()),
        };
        assert_eq!(
            params_key(&query.params()),
            "page=1&per_page=20&role=vendor&status=blocked&q=ada"
        );
    }
}
