//! Decoding raw form submissions into typed form records
//!
//! A form type declares the keys it reads and the kind of each value through
//! [`FormFields::FIELDS`]. The codec looks each key up in the raw submission,
//! coerces it to its declared kind, and hands the result to serde. Coercion
//! failures are the client's fault; a record that serde then rejects means the
//! field table and the Rust type disagree, which is a bug in this crate.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

/// How a raw string value is coerced before it reaches the target type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Passed through unchanged; missing keys decode to `""`
    Text,
    /// Parsed as a signed integer; missing or empty keys decode to `0`
    Int,
}

/// One entry in a form's field table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormField {
    /// Key of the value in the submitted form
    pub key: &'static str,
    /// Coercion applied to the value
    pub kind: FieldKind,
}

impl FormField {
    /// A text field read from `key`
    #[must_use]
    pub const fn text(key: &'static str) -> Self {
        Self {
            key,
            kind: FieldKind::Text,
        }
    }

    /// An integer field read from `key`
    #[must_use]
    pub const fn int(key: &'static str) -> Self {
        Self {
            key,
            kind: FieldKind::Int,
        }
    }
}

/// Form records that can be produced by [`FormCodec::decode`]
///
/// Field names in `FIELDS` must match the serde names of the record's fields.
pub trait FormFields: DeserializeOwned {
    /// The field table for this form
    const FIELDS: &'static [FormField];
}

/// Form decoding failures
#[derive(Debug, Error)]
pub enum FormError {
    /// A submitted value could not be coerced to its declared kind
    #[error("invalid value for field '{key}': {reason}")]
    InvalidValue {
        /// Form key of the offending value
        key: &'static str,
        /// Why coercion failed
        reason: String,
    },

    /// The target type cannot hold what its own field table produces
    #[error("invalid decode target {target}: {reason}")]
    InvalidTarget {
        /// Rust type name of the target
        target: &'static str,
        /// Deserializer message
        reason: String,
    },
}

impl FormError {
    /// True for the programmer-error kind that must never reach a client.
    #[must_use]
    pub const fn is_invalid_target(&self) -> bool {
        matches!(self, Self::InvalidTarget { .. })
    }
}

/// Stateless decoder shared through the application state
#[derive(Debug, Clone, Copy, Default)]
pub struct FormCodec;

impl FormCodec {
    /// Create a codec
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode `raw` key/value pairs into `T`.
    ///
    /// When a key repeats, the first value is used. Keys that are not in the
    /// field table are ignored.
    pub fn decode<T: FormFields>(&self, raw: &[(String, String)]) -> Result<T, FormError> {
        let mut record = Map::with_capacity(T::FIELDS.len());

        for field in T::FIELDS {
            let submitted = raw
                .iter()
                .find(|(key, _)| key == field.key)
                .map(|(_, value)| value.as_str());
            record.insert(field.key.to_string(), coerce(field, submitted)?);
        }

        serde_json::from_value(Value::Object(record)).map_err(|err| FormError::InvalidTarget {
            target: std::any::type_name::<T>(),
            reason: err.to_string(),
        })
    }
}

fn coerce(field: &FormField, submitted: Option<&str>) -> Result<Value, FormError> {
    match field.kind {
        FieldKind::Text => Ok(Value::from(submitted.unwrap_or_default())),
        FieldKind::Int => {
            let trimmed = submitted.map(str::trim).unwrap_or_default();
            if trimmed.is_empty() {
                return Ok(Value::from(0_i64));
            }
            trimmed
                .parse::<i64>()
                .map(Value::from)
                .map_err(|err| FormError::InvalidValue {
                    key: field.key,
                    reason: err.to_string(),
                })
        }
    }
}
