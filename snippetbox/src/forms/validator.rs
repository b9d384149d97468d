//! Field and non-field validation error accumulation
//!
//! A [`Validator`] collects failures from independent predicate checks.
//! Each form owns one as a named field and calls it directly:
//!
//! ```rust
//! use snippetbox::forms::validator::{max_chars, not_blank, Validator};
//!
//! let title = "";
//! let mut validator = Validator::default();
//! validator.check_field(not_blank(title), "title", "This field cannot be blank");
//! validator.check_field(max_chars(title, 100), "title", "too long");
//!
//! assert!(!validator.valid());
//! assert_eq!(validator.field_error("title"), Some("This field cannot be blank"));
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

/// Pattern accepted for email addresses on the signup and login forms.
///
/// Word characters are ASCII only; `[[:word:]]` never matches non-ASCII letters.
pub static EMAIL_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[[:word:]]+(?:\.[[:word:]]+)*@[[:word:]]+(?:\.[[:word:]-]+)*\.[a-zA-Z]{2,}$")
        .expect("email pattern is valid")
});

/// Accumulated validation failures for one form submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Validator {
    /// One message per field key; the first failure recorded for a key wins
    pub field_errors: HashMap<String, String>,

    /// Failures that belong to the submission as a whole, in insertion order
    pub non_field_errors: Vec<String>,
}

impl Validator {
    /// True when no field or non-field error has been recorded.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.field_errors.is_empty() && self.non_field_errors.is_empty()
    }

    /// Record `message` for `key` unless the key already has an error.
    pub fn add_field_error(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.field_errors
            .entry(key.into())
            .or_insert_with(|| message.into());
    }

    /// Append a message that is not tied to a single field.
    pub fn add_non_field_error(&mut self, message: impl Into<String>) {
        self.non_field_errors.push(message.into());
    }

    /// Record a field error only when `ok` is false.
    pub fn check_field(&mut self, ok: bool, key: &str, message: &str) {
        if !ok {
            self.add_field_error(key, message);
        }
    }

    /// The recorded message for `key`, if any.
    #[must_use]
    pub fn field_error(&self, key: &str) -> Option<&str> {
        self.field_errors.get(key).map(String::as_str)
    }
}

/// True if `value` contains something other than whitespace.
#[must_use]
pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

/// True if `value` has no more than `n` characters.
#[must_use]
pub fn max_chars(value: &str, n: usize) -> bool {
    value.chars().count() <= n
}

/// True if `value` has at least `n` characters.
#[must_use]
pub fn min_chars(value: &str, n: usize) -> bool {
    value.chars().count() >= n
}

/// True if `value` matches `rx`.
#[must_use]
pub fn matches(value: &str, rx: &Regex) -> bool {
    rx.is_match(value)
}

/// True if `value` is one of `permitted`.
#[must_use]
pub fn permitted_int<T: PartialEq>(value: T, permitted: &[T]) -> bool {
    permitted.contains(&value)
}
