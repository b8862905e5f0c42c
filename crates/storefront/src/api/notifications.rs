//! In-app notifications for the calling user.

use serde::Serialize;
use tracing::instrument;

use emporium_core::NotificationId;
use emporium_core::models::Notification;

use super::{ApiClient, ApiError, Caller, Invalidation, QueryKey, Resource};

#[derive(Debug, Serialize)]
struct MarkRead {
    read: bool,
}

impl ApiClient {
    fn notifications_key(caller: Caller<'_>) -> QueryKey {
        QueryKey::list(Resource::Notifications, "").scoped(caller.scope())
    }

    /// Newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails after retries.
    #[instrument(skip(self))]
    pub async fn notifications(&self, caller: Caller<'_>) -> Result<Vec<Notification>, ApiError> {
        self.query(
            Self::notifications_key(caller),
            "/notifications",
            &Vec::new(),
            caller,
        )
        .await
    }

    /// Mark one notification read and patch it into the cached list.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the update.
    #[instrument(skip(self))]
    pub async fn mark_notification_read(
        &self,
        caller: Caller<'_>,
        id: NotificationId,
    ) -> Result<Notification, ApiError> {
        let updated: Notification = self
            .patch(&format!("/notifications/{id}"), &MarkRead { read: true }, caller)
            .await?;

        let key = Self::notifications_key(caller);
        let cached = self
            .cache()
            .get(&key)
            .await
            .and_then(|value| serde_json::from_value::<Vec<Notification>>((*value).clone()).ok());
        match cached {
            Some(mut list) => {
                for notification in list.iter_mut().filter(|n| n.id == updated.id) {
                    *notification = updated.clone();
                }
                self.cache().set(key, &list).await;
            }
            None => {
                self.cache()
                    .invalidate(Invalidation::Resource(Resource::Notifications))
                    .await;
            }
        }
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns error if the backend rejects the update.
    #[instrument(skip(self))]
    pub async fn mark_all_notifications_read(&self, caller: Caller<'_>) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .post("/notifications/read-all", &serde_json::json!({}), caller)
            .await?;
        let target = caller.scope().map_or(
            Invalidation::Resource(Resource::Notifications),
            |user| Invalidation::Scoped(Resource::Notifications, user),
        );
        self.cache().invalidate(target).await;
        Ok(())
    }
}
