//! Helper functions available inside page templates
//!
//! Helpers are registered as filters from the static [`HELPERS`] table
//! before any template source is added to an environment:
//!
//! ```jinja
//! <time>{{ snippet.created|human_date }}</time>
//! ```

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use super::TemplateError;

/// Signature shared by every template helper
pub type Helper = fn(String) -> String;

/// Every helper registered into each composed template, by filter name
pub const HELPERS: &[(&str, Helper)] = &[("human_date", human_date)];

/// Format an RFC 3339 timestamp as `02 Jan 2006 at 15:04` in UTC.
///
/// Empty input renders as an empty string; input that is not a timestamp is
/// returned unchanged.
///
/// # Examples
///
/// ```rust
/// use snippetbox::template::helpers::human_date;
///
/// assert_eq!(
///     human_date("2024-03-17T10:15:00Z".to_string()),
///     "17 Mar 2024 at 10:15"
/// );
/// ```
#[must_use]
pub fn human_date(value: String) -> String {
    if value.is_empty() {
        return value;
    }
    DateTime::parse_from_rfc3339(&value).map_or(value, |parsed| {
        parsed
            .with_timezone(&Utc)
            .format("%d %b %Y at %H:%M")
            .to_string()
    })
}

/// Reject tables with empty, malformed or duplicate helper names.
pub(crate) fn validate(helpers: &[(&str, Helper)]) -> Result<(), TemplateError> {
    let mut seen = HashSet::with_capacity(helpers.len());
    for (name, _) in helpers {
        let well_formed = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !well_formed || !seen.insert(*name) {
            return Err(TemplateError::InvalidHelper((*name).to_string()));
        }
    }
    Ok(())
}
