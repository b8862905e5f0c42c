//! Per-visitor client store.
//!
//! A flat key/value container backed by the visitor's session. It holds the
//! signed-in user and the small bits of UI state that survive a redirect:
//! header badges, the search box, the open confirmation modal, bulk-action
//! selections and one-shot flash banners.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use emporium_core::models::User;
use emporium_core::selection::Selection;
use emporium_core::{Email, ProductId, UserId, UserRole};

use crate::views::ModalView;

/// Session keys for client store data.
pub mod keys {
    pub const CURRENT_USER: &str = "current_user";
    pub const CART_COUNT: &str = "cart_count";
    pub const WISHLIST_PRODUCTS: &str = "wishlist_products";
    pub const UNREAD: &str = "unread_notifications";
    pub const SEARCH: &str = "search_query";
    pub const MODAL: &str = "modal";
    pub const FLASH: &str = "flash";
}

/// The signed-in user and the bearer token for backend calls.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
    pub token: String,
}

impl CurrentUser {
    #[must_use]
    pub fn new(user: &User, token: String) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            token,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Vendors and admins may manage products.
    #[must_use]
    pub fn is_vendor(&self) -> bool {
        matches!(self.role, UserRole::Vendor | UserRole::Admin)
    }
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Destructive actions gated by a confirmation dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModalKind {
    DeleteProduct,
    DeleteWishlist,
    DeleteCategory,
    CancelOrder,
    DeleteUsers,
}

/// The open confirmation dialog and what it would act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modal {
    pub kind: ModalKind,
    pub target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Error,
}

/// A banner shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == FlashKind::Error
    }
}

/// Tables that support row selection for bulk actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkTable {
    Users,
    Orders,
    Reviews,
}

impl BulkTable {
    const fn key(self) -> &'static str {
        match self {
            Self::Users => "selection.users",
            Self::Orders => "selection.orders",
            Self::Reviews => "selection.reviews",
        }
    }
}

/// Shared page chrome: header badges, search box, flash banner and the open
/// confirmation dialog.
#[derive(Debug, Clone, Default)]
pub struct Chrome {
    pub user: Option<CurrentUser>,
    pub cart_count: u32,
    pub unread: usize,
    pub search: String,
    pub flash: Option<Flash>,
    pub modal: Option<ModalView>,
}

impl Chrome {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(CurrentUser::is_admin)
    }

    #[must_use]
    pub fn is_vendor(&self) -> bool {
        self.user.as_ref().is_some_and(CurrentUser::is_vendor)
    }

    #[must_use]
    pub fn user_name(&self) -> &str {
        self.user.as_ref().map_or("", |u| u.name.as_str())
    }
}

type StoreResult<T> = Result<T, tower_sessions::session::Error>;

/// Session-backed client store extractor.
#[derive(Debug, Clone)]
pub struct Store(Session);

impl<S> FromRequestParts<S> for Store
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(Self)
            .ok_or((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Session layer is not installed",
            ))
    }
}

impl Store {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self(session)
    }

    async fn read<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.0.get::<T>(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read session value");
                None
            }
        }
    }

    // -- authentication ------------------------------------------------------

    pub async fn current_user(&self) -> Option<CurrentUser> {
        self.read(keys::CURRENT_USER).await
    }

    /// Store the user after login; a new session id guards against fixation.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn sign_in(&self, user: &CurrentUser) -> StoreResult<()> {
        self.0.cycle_id().await?;
        self.0.insert(keys::CURRENT_USER, user).await
    }

    /// Replace the stored user after a profile edit.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn refresh_user(&self, user: &CurrentUser) -> StoreResult<()> {
        self.0.insert(keys::CURRENT_USER, user).await
    }

    /// Forget the user and every user-scoped value.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn sign_out(&self) -> StoreResult<()> {
        for key in [
            keys::CURRENT_USER,
            keys::CART_COUNT,
            keys::WISHLIST_PRODUCTS,
            keys::UNREAD,
            keys::MODAL,
        ] {
            self.0.remove_value(key).await?;
        }
        for table in [BulkTable::Users, BulkTable::Orders, BulkTable::Reviews] {
            self.0.remove_value(table.key()).await?;
        }
        Ok(())
    }

    // -- badges --------------------------------------------------------------

    pub async fn cart_count(&self) -> u32 {
        self.read(keys::CART_COUNT).await.unwrap_or(0)
    }

    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn set_cart_count(&self, count: u32) -> StoreResult<()> {
        self.0.insert(keys::CART_COUNT, count).await
    }

    pub async fn unread(&self) -> usize {
        self.read(keys::UNREAD).await.unwrap_or(0)
    }

    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn set_unread(&self, count: usize) -> StoreResult<()> {
        self.0.insert(keys::UNREAD, count).await
    }

    /// Products saved in any of the user's wishlists (heart icons).
    pub async fn wishlist_products(&self) -> Vec<ProductId> {
        self.read(keys::WISHLIST_PRODUCTS).await.unwrap_or_default()
    }

    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn set_wishlist_products(&self, ids: &[ProductId]) -> StoreResult<()> {
        self.0.insert(keys::WISHLIST_PRODUCTS, ids).await
    }

    // -- search --------------------------------------------------------------

    pub async fn search(&self) -> String {
        self.read(keys::SEARCH).await.unwrap_or_default()
    }

    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn set_search(&self, query: &str) -> StoreResult<()> {
        self.0.insert(keys::SEARCH, query.trim()).await
    }

    // -- confirmation modal --------------------------------------------------

    pub async fn modal(&self) -> Option<Modal> {
        self.read(keys::MODAL).await
    }

    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn open_modal(&self, kind: ModalKind, target: impl Into<String>) -> StoreResult<()> {
        let modal = Modal {
            kind,
            target: target.into(),
        };
        self.0.insert(keys::MODAL, modal).await
    }

    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn close_modal(&self) -> StoreResult<()> {
        self.0.remove_value(keys::MODAL).await.map(drop)
    }

    /// Close the modal and report whether it was open for exactly this action.
    ///
    /// A confirm POST performs its mutation only when this returns `true`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn take_modal_if(&self, kind: ModalKind, target: &str) -> StoreResult<bool> {
        let open = self.modal().await;
        self.close_modal().await?;
        Ok(open.is_some_and(|m| m.kind == kind && m.target == target))
    }

    // -- bulk selection ------------------------------------------------------

    pub async fn selection<T>(&self, table: BulkTable) -> Selection<T>
    where
        T: Copy + PartialEq + serde::de::DeserializeOwned,
    {
        self.read(table.key()).await.unwrap_or_default()
    }

    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn set_selection<T>(&self, table: BulkTable, selection: &Selection<T>) -> StoreResult<()>
    where
        T: Copy + PartialEq + Serialize + Send + Sync,
    {
        self.0.insert(table.key(), selection).await
    }

    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn clear_selection(&self, table: BulkTable) -> StoreResult<()> {
        self.0.remove_value(table.key()).await.map(drop)
    }

    // -- flash ---------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn flash(&self, kind: FlashKind, message: impl Into<String>) -> StoreResult<()> {
        let flash = Flash {
            kind,
            message: message.into(),
        };
        self.0.insert(keys::FLASH, flash).await
    }

    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn flash_success(&self, message: impl Into<String>) -> StoreResult<()> {
        self.flash(FlashKind::Success, message).await
    }

    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn flash_error(&self, message: impl Into<String>) -> StoreResult<()> {
        self.flash(FlashKind::Error, message).await
    }

    pub async fn take_flash(&self) -> Option<Flash> {
        match self.0.remove::<Flash>(keys::FLASH).await {
            Ok(flash) => flash,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read flash message");
                None
            }
        }
    }

    /// Everything the page header needs. Consumes the pending flash.
    pub async fn chrome(&self) -> Chrome {
        Chrome {
            user: self.current_user().await,
            cart_count: self.cart_count().await,
            unread: self.unread().await,
            search: self.search().await,
            flash: self.take_flash().await,
            modal: self.modal().await.as_ref().map(ModalView::new),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn store() -> Store {
        Store::new(Session::new(None, Arc::new(MemoryStore::default()), None))
    }

    fn user(role: UserRole) -> CurrentUser {
        CurrentUser {
            id: UserId::new(7),
            name: "Ada".to_string(),
            email: Email::parse("ada@example.com").unwrap(),
            role,
            token: "tok_secret".to_string(),
        }
    }

    #[test]
    fn test_current_user_debug_redacts_token() {
        let debug = format!("{:?}", user(UserRole::Customer));
        assert!(!debug.contains("tok_secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_roles() {
        assert!(user(UserRole::Admin).is_vendor());
        assert!(user(UserRole::Vendor).is_vendor());
        assert!(!user(UserRole::Customer).is_vendor());
        assert!(!user(UserRole::Vendor).is_admin());
    }

    #[tokio::test]
    async fn test_modal_confirms_only_matching_target() {
        let store = store();
        store.open_modal(ModalKind::DeleteWishlist, "4").await.unwrap();
        assert!(!store.take_modal_if(ModalKind::DeleteWishlist, "5").await.unwrap());
        // A mismatched confirm still closes the dialog.
        assert!(store.modal().await.is_none());

        store.open_modal(ModalKind::DeleteWishlist, "4").await.unwrap();
        assert!(!store.take_modal_if(ModalKind::DeleteProduct, "4").await.unwrap());

        store.open_modal(ModalKind::DeleteWishlist, "4").await.unwrap();
        assert_eq!(
            store.chrome().await.modal.map(|m| m.action),
            Some("/wishlists/4/delete/confirm".to_string())
        );
        assert!(store.take_modal_if(ModalKind::DeleteWishlist, "4").await.unwrap());
    }

    #[tokio::test]
    async fn test_flash_is_shown_once() {
        let store = store();
        store.flash_success("Saved").await.unwrap();
        let chrome = store.chrome().await;
        assert_eq!(chrome.flash.map(|f| f.message), Some("Saved".to_string()));
        assert!(store.chrome().await.flash.is_none());
    }

    #[tokio::test]
    async fn test_selection_round_trip_and_clear() {
        let store = store();
        let mut selection = store.selection::<UserId>(BulkTable::Users).await;
        selection.toggle(UserId::new(1));
        selection.toggle(UserId::new(2));
        store.set_selection(BulkTable::Users, &selection).await.unwrap();

        let loaded = store.selection::<UserId>(BulkTable::Users).await;
        assert_eq!(loaded.ids(), &[UserId::new(1), UserId::new(2)]);
        assert!(store.selection::<UserId>(BulkTable::Orders).await.is_empty());

        store.clear_selection(BulkTable::Users).await.unwrap();
        assert!(store.selection::<UserId>(BulkTable::Users).await.is_empty());
    }

    #[tokio::test]
    async fn test_sign_out_clears_user_state() {
        let store = store();
        store.sign_in(&user(UserRole::Customer)).await.unwrap();
        store.set_cart_count(3).await.unwrap();
        store.sign_out().await.unwrap();
        assert!(store.current_user().await.is_none());
        assert_eq!(store.cart_count().await, 0);
    }
}
