//! Outcome of a bulk action run one request per id.
//!
//! Bulk actions never batch, retry or roll back: each id either completed or
//! failed with the message the backend gave, and the tally is reported back
//! to the operator as a banner.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// One id that failed during a bulk run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkFailure {
    pub id: String,
    pub message: String,
}

/// Completed count plus per-id failures, in the order they were attempted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub completed: usize,
    pub failed: Vec<BulkFailure>,
}

impl BulkOutcome {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.completed += 1;
    }

    pub fn record_failure(&mut self, id: impl Display, message: impl Into<String>) {
        self.failed.push(BulkFailure {
            id: id.to_string(),
            message: message.into(),
        });
    }

    #[must_use]
    pub fn attempted(&self) -> usize {
        self.completed + self.failed.len()
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Banner text, e.g. `Blocked 2 users, 1 failed: #7 User not found`.
    ///
    /// `verb` is the past-tense action and `noun` the singular entity; a plain
    /// `s` is appended for plurals.
    #[must_use]
    pub fn summary(&self, verb: &str, noun: &str) -> String {
        let plural = if self.completed == 1 { "" } else { "s" };
        let mut text = format!("{verb} {} {noun}{plural}", self.completed);
        if self.has_failures() {
            let details = self
                .failed
                .iter()
                .map(|f| format!("#{} {}", f.id, f.message))
                .collect::<Vec<_>>()
                .join("; ");
            text.push_str(&format!(", {} failed: {details}", self.failed.len()));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_succeeded() {
        let mut outcome = BulkOutcome::new();
        for _ in 0..3 {
            outcome.record_success();
        }
        assert_eq!(outcome.attempted(), 3);
        assert!(!outcome.has_failures());
        assert_eq!(outcome.summary("Blocked", "user"), "Blocked 3 users");
    }

    #[test]
    fn test_partial_failure_summary() {
        let mut outcome = BulkOutcome::new();
        outcome.record_success();
        outcome.record_failure(7, "User not found");
        outcome.record_success();
        assert_eq!(outcome.attempted(), 3);
        assert_eq!(
            outcome.summary("Blocked", "user"),
            "Blocked 2 users, 1 failed: #7 User not found"
        );
    }

    #[test]
    fn test_singular() {
        let mut outcome = BulkOutcome::new();
        outcome.record_success();
        assert_eq!(outcome.summary("Approved", "review"), "Approved 1 review");
    }

    #[test]
    fn test_nothing_attempted() {
        let outcome = BulkOutcome::new();
        assert_eq!(outcome.summary("Deleted", "user"), "Deleted 0 users");
    }
}
