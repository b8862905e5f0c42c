//! Inline form validation.
//!
//! Every form in the storefront validates before it issues a request; a form
//! with errors is re-rendered with the messages next to the fields and the
//! backend is never called. The rules are deliberately simple: non-empty,
//! length bounds, numeric ranges, email shape and confirmation matches.

pub mod forms;

use std::fmt;

use serde::Serialize;

use crate::types::Email;

/// A problem with one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// All field errors of a submitted form, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Message for a field, if it failed.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// Whether a field failed (template helper).
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Message for a field or an empty string (template helper).
    #[must_use]
    pub fn message(&self, field: &str) -> &str {
        self.get(field).unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

impl std::error::Error for ValidationErrors {}

/// Accumulates field errors. Only the first failure per field is kept so a
/// blank required field doesn't also report a length error.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn failed(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        if !self.failed(field) {
            self.errors.push(FieldError {
                field,
                message: message.into(),
            });
        }
    }

    /// Record a failure when `ok` is false.
    pub fn check(&mut self, field: &'static str, ok: bool, message: &str) -> &mut Self {
        if !ok {
            self.push(field, message);
        }
        self
    }

    /// Trimmed value must be non-empty.
    pub fn required(&mut self, field: &'static str, label: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.push(field, format!("{label} is required"));
        }
        self
    }

    /// Trimmed length in characters must be within `min..=max`.
    pub fn length(
        &mut self,
        field: &'static str,
        label: &str,
        value: &str,
        min: usize,
        max: usize,
    ) -> &mut Self {
        let len = value.trim().chars().count();
        if len < min {
            self.push(field, format!("{label} must be at least {min} characters"));
        } else if len > max {
            self.push(field, format!("{label} must be at most {max} characters"));
        }
        self
    }

    /// Numeric value must be within `min..=max`.
    pub fn range<T>(&mut self, field: &'static str, label: &str, value: T, min: T, max: T) -> &mut Self
    where
        T: PartialOrd + fmt::Display,
    {
        if value < min || value > max {
            self.push(field, format!("{label} must be between {min} and {max}"));
        }
        self
    }

    /// Value must parse as an email address.
    pub fn email(&mut self, field: &'static str, value: &str) -> &mut Self {
        if let Err(e) = Email::parse(value) {
            self.push(field, e.to_string());
        }
        self
    }

    /// Confirmation field must equal the original.
    pub fn matches(
        &mut self,
        field: &'static str,
        value: &str,
        other: &str,
        message: &str,
    ) -> &mut Self {
        if value != other {
            self.push(field, message);
        }
        self
    }

    /// Whether any rule failed so far.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Finish validation.
    ///
    /// # Errors
    ///
    /// Returns the collected [`ValidationErrors`] if any rule failed.
    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_reports_once_per_field() {
        let mut v = Validator::new();
        v.required("name", "Name", "   ").length("name", "Name", "   ", 2, 10);
        let errors = v.finish().expect_err("blank name");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("name"), Some("Name is required"));
    }

    #[test]
    fn test_length_bounds() {
        let mut v = Validator::new();
        v.length("a", "A", "x", 2, 5).length("b", "B", "toolong", 2, 5);
        let errors = v.finish().expect_err("both out of bounds");
        assert_eq!(errors.get("a"), Some("A must be at least 2 characters"));
        assert_eq!(errors.get("b"), Some("B must be at most 5 characters"));
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        let mut v = Validator::new();
        v.length("name", "Name", "ééé", 1, 3);
        assert!(v.finish().is_ok());
    }

    #[test]
    fn test_range() {
        let mut v = Validator::new();
        v.range("rating", "Rating", 6, 1, 5);
        let errors = v.finish().expect_err("out of range");
        assert_eq!(errors.message("rating"), "Rating must be between 1 and 5");
        assert_eq!(errors.message("other"), "");
    }

    #[test]
    fn test_email_and_matches() {
        let mut v = Validator::new();
        v.email("email", "nope").matches("confirm", "a", "b", "Passwords do not match");
        let errors = v.finish().expect_err("two failures");
        assert!(errors.has("email"));
        assert_eq!(errors.get("confirm"), Some("Passwords do not match"));
        assert_eq!(
            errors.to_string(),
            "email: email must look like name@example.com; confirm: Passwords do not match"
        );
    }

    #[test]
    fn test_clean_form_passes() {
        let mut v = Validator::new();
        v.required("name", "Name", "Gifts")
            .length("name", "Name", "Gifts", 1, 50)
            .check("terms", true, "unused");
        assert!(!v.has_errors());
        assert!(v.finish().is_ok());
    }
}
