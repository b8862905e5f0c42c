//! Notification inbox.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use emporium_core::NotificationId;
use emporium_core::models::Notification;
use emporium_core::models::notification::unread_count;

use crate::api::Caller;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::state::AppState;
use crate::store::{Chrome, Store};
use crate::views::local_path;

#[derive(Debug, Clone)]
pub struct NotificationView {
    pub id: NotificationId,
    pub kind: &'static str,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub has_link: bool,
    pub received: String,
}

impl From<&Notification> for NotificationView {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id,
            kind: n.kind.as_str(),
            title: n.title.clone(),
            message: n.message.clone(),
            read: n.read,
            has_link: n.link.is_some(),
            received: n.created_at.format("%b %d, %H:%M").to_string(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "notifications/index.html")]
pub struct NotificationsTemplate {
    pub chrome: Chrome,
    pub notifications: Vec<NotificationView>,
    pub unread: usize,
}

/// List notifications and refresh the header badge.
#[instrument(skip(state, store, user))]
pub async fn index(
    State(state): State<AppState>,
    store: Store,
    RequireAuth(user): RequireAuth,
) -> Result<NotificationsTemplate, AppError> {
    let notifications = state.api().notifications(Caller::user(&user)).await?;
    let unread = unread_count(&notifications);
    store.set_unread(unread).await?;

    Ok(NotificationsTemplate {
        notifications: notifications.iter().map(NotificationView::from).collect(),
        unread,
        chrome: store.chrome().await,
    })
}

/// Mark one notification read, then follow its link when it points here.
#[instrument(skip(state, store, user))]
pub async fn mark_read(
    State(state): State<AppState>,
    store: Store,
    RequireAuth(user): RequireAuth,
    Path(id): Path<NotificationId>,
) -> Result<Response, AppError> {
    let caller = Caller::user(&user);
    let target = match state.api().mark_notification_read(caller, id).await {
        Ok(notification) => {
            let remaining = state.api().notifications(caller).await?;
            store.set_unread(unread_count(&remaining)).await?;
            local_path(notification.link.as_deref(), "/notifications")
        }
        Err(e) => {
            super::flash_failure(&store, e).await?;
            "/notifications".to_string()
        }
    };
    Ok(Redirect::to(&target).into_response())
}

/// Mark everything read.
#[instrument(skip(state, store, user))]
pub async fn mark_all_read(
    State(state): State<AppState>,
    store: Store,
    RequireAuth(user): RequireAuth,
) -> Result<Response, AppError> {
    match state
        .api()
        .mark_all_notifications_read(Caller::user(&user))
        .await
    {
        Ok(()) => store.set_unread(0).await?,
        Err(e) => super::flash_failure(&store, e).await?,
    }
    Ok(Redirect::to("/notifications").into_response())
}
