//! Accounts and login sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Email, UserId, UserRole, UserStatus};

/// An account as seen by the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        matches!(self.status, UserStatus::Blocked)
    }
}

/// Response of `POST /auth/login` and `POST /auth/register`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthSession {
    /// Bearer token for subsequent API calls.
    pub token: String,
    pub user: User,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}
