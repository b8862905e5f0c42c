//! Sequential bulk actions.
//!
//! One request per selected id, strictly one after another. A failure is
//! counted and the loop moves on; nothing is batched, retried or rolled back.

use std::fmt::Display;
use std::future::Future;

use emporium_core::bulk::BulkOutcome;

use crate::api::ApiError;
use crate::error::add_breadcrumb;

/// Run `action` for each id in order and tally the results.
pub async fn run_sequential<I, F, Fut>(label: &str, ids: &[I], mut action: F) -> BulkOutcome
where
    I: Copy + Display,
    F: FnMut(I) -> Fut,
    Fut: Future<Output = Result<(), ApiError>>,
{
    let count = ids.len().to_string();
    add_breadcrumb("bulk", label, Some(&[("count", count.as_str())]));

    let mut outcome = BulkOutcome::new();
    for &id in ids {
        match action(id).await {
            Ok(()) => outcome.record_success(),
            Err(e) => {
                tracing::warn!(action = label, %id, error = %e, "Bulk item failed");
                outcome.record_failure(id, e.user_message());
            }
        }
    }

    if outcome.has_failures() {
        tracing::warn!(
            action = label,
            completed = outcome.completed,
            failed = outcome.failed.len(),
            "Bulk action completed with errors"
        );
    } else {
        tracing::info!(action = label, completed = outcome.completed, "Bulk action completed");
    }
    outcome
}
