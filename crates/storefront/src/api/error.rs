//! Error classification for REST backend calls.
//!
//! Backend errors are told apart only by response shape: the status code and
//! an optional `message` field in the JSON body.

use serde::Deserialize;
use thiserror::Error;

use emporium_core::OrderStatus;

/// Banner text when the backend gave nothing presentable.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Errors that can occur when calling the REST backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("API error: {status}{}", .message.as_deref().map(|m| format!(" - {m}")).unwrap_or_default())]
    Api { status: u16, message: Option<String> },

    /// Missing or expired bearer token.
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found")]
    NotFound { message: Option<String> },

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {retry_after} seconds")]
    RateLimited {
        retry_after: u64,
        message: Option<String>,
    },

    /// Body did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The order's current status does not allow the requested one.
    #[error("Order cannot move from {from} to {to}")]
    Transition { from: OrderStatus, to: OrderStatus },
}

/// Error body shape. Anything else counts as shapeless.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Pull a non-blank `message` out of an error body.
pub(crate) fn extract_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.message.trim().to_string())
        .filter(|m| !m.is_empty())
}

impl ApiError {
    /// Classify a failed response from its status and body text.
    pub(crate) fn from_status(status: u16, body: &str, retry_after: Option<u64>) -> Self {
        let message = extract_message(body);
        match status {
            401 => Self::Unauthorized,
            404 => Self::NotFound { message },
            429 => Self::RateLimited {
                retry_after: retry_after.unwrap_or(60),
                message,
            },
            _ => Self::Api { status, message },
        }
    }

    /// Text for the inline error banner: the backend's own message verbatim
    /// when it sent one, the generic fallback otherwise.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api {
                message: Some(message),
                ..
            }
            | Self::NotFound {
                message: Some(message),
            }
            | Self::RateLimited {
                message: Some(message),
                ..
            } => message.clone(),
            Self::Unauthorized => "Please sign in to continue.".to_string(),
            Self::Transition { from, to } => format!(
                "A {} order can't be marked {}.",
                from.label().to_lowercase(),
                to.label().to_lowercase()
            ),
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }

    /// Reads are retried on these; mutations never are.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Failures on our side or the backend's, as opposed to the caller's.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        match self {
            Self::Http(_) | Self::Parse(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_surfaced_verbatim() {
        let err = ApiError::from_status(422, r#"{"message":"Wishlist name already taken"}"#, None);
        assert_eq!(err.user_message(), "Wishlist name already taken");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_shapeless_body_uses_generic_message() {
        let err = ApiError::from_status(500, "<html>Bad Gateway</html>", None);
        assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);
        assert!(err.is_retryable());
        assert!(err.is_server_error());

        let err = ApiError::from_status(400, r#"{"error":"nope"}"#, None);
        assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);

        let err = ApiError::from_status(400, r#"{"message":"   "}"#, None);
        assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            ApiError::from_status(401, "", None),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from_status(404, r#"{"message":"No such product"}"#, None),
            ApiError::NotFound { message: Some(_) }
        ));
        assert!(matches!(
            ApiError::from_status(429, "", Some(7)),
            ApiError::RateLimited { retry_after: 7, .. }
        ));
    }

    #[test]
    fn test_refused_transition_names_both_statuses() {
        let err = ApiError::Transition {
            from: OrderStatus::Shipped,
            to: OrderStatus::Cancelled,
        };
        assert_eq!(err.user_message(), "A shipped order can't be marked cancelled.");
        assert!(!err.is_retryable());
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_parse_error_not_retried() {
        let err = ApiError::Parse("missing field `id`".to_string());
        assert!(!err.is_retryable());
        assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_display() {
        let err = ApiError::Api {
            status: 503,
            message: Some("Maintenance".to_string()),
        };
        assert_eq!(err.to_string(), "API error: 503 - Maintenance");
        let err = ApiError::Api {
            status: 502,
            message: None,
        };
        assert_eq!(err.to_string(), "API error: 502");
    }
}
