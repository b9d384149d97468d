//! Form records for the snippet and user pages
//!
//! Each form holds its submitted values plus a [`Validator`]. Forms are
//! serialized into template data so an invalid submission can be re-rendered
//! with its values and errors; password fields are never serialized.

pub mod codec;
pub mod validator;

pub use codec::{FieldKind, FormCodec, FormError, FormField, FormFields};
pub use validator::Validator;

use serde::{Deserialize, Serialize};
use self::validator::{matches, max_chars, min_chars, not_blank, permitted_int, EMAIL_RX};

const BLANK: &str = "This field cannot be blank";
const INVALID_EMAIL: &str = "This field must be a valid email address";

/// Snippet lifetimes, in days, offered by the create form
pub const PERMITTED_EXPIRES: [i64; 3] = [1, 7, 365];

/// Fields of the snippet creation form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetCreateForm {
    /// Snippet title
    pub title: String,
    /// Snippet body
    pub content: String,
    /// Lifetime in days
    pub expires: i64,
    /// Validation results
    #[serde(skip_deserializing)]
    pub validator: Validator,
}

impl Default for SnippetCreateForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            expires: 365,
            validator: Validator::default(),
        }
    }
}

impl FormFields for SnippetCreateForm {
    const FIELDS: &'static [FormField] = &[
        FormField::text("title"),
        FormField::text("content"),
        FormField::int("expires"),
    ];
}

impl SnippetCreateForm {
    /// Run every field check, recording failures on the embedded validator.
    pub fn validate(&mut self) {
        let v = &mut self.validator;
        v.check_field(not_blank(&self.title), "title", BLANK);
        v.check_field(
            max_chars(&self.title, 100),
            "title",
            "This field cannot be more than 100 characters long",
        );
        v.check_field(not_blank(&self.content), "content", BLANK);
        v.check_field(
            permitted_int(self.expires, &PERMITTED_EXPIRES),
            "expires",
            "This field must equal 1, 7 or 365",
        );
    }
}

/// Fields of the signup form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSignupForm {
    /// Display name
    pub name: String,
    /// Login email
    pub email: String,
    /// Plain-text password, never echoed back
    #[serde(skip_serializing)]
    pub password: String,
    /// Validation results
    #[serde(skip_deserializing)]
    pub validator: Validator,
}

impl FormFields for UserSignupForm {
    const FIELDS: &'static [FormField] = &[
        FormField::text("name"),
        FormField::text("email"),
        FormField::text("password"),
    ];
}

impl UserSignupForm {
    /// Run every field check, recording failures on the embedded validator.
    pub fn validate(&mut self) {
        let v = &mut self.validator;
        v.check_field(not_blank(&self.name), "name", BLANK);
        v.check_field(not_blank(&self.email), "email", BLANK);
        v.check_field(matches(&self.email, &EMAIL_RX), "email", INVALID_EMAIL);
        v.check_field(not_blank(&self.password), "password", BLANK);
        v.check_field(
            min_chars(&self.password, 8),
            "password",
            "This field must be at least 8 characters long",
        );
    }
}

/// Fields of the login form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLoginForm {
    /// Login email
    pub email: String,
    /// Plain-text password, never echoed back
    #[serde(skip_serializing)]
    pub password: String,
    /// Validation results
    #[serde(skip_deserializing)]
    pub validator: Validator,
}

impl FormFields for UserLoginForm {
    const FIELDS: &'static [FormField] = &[FormField::text("email"), FormField::text("password")];
}

impl UserLoginForm {
    /// Run every field check, recording failures on the embedded validator.
    pub fn validate(&mut self) {
        let v = &mut self.validator;
        v.check_field(not_blank(&self.email), "email", BLANK);
        v.check_field(matches(&self.email, &EMAIL_RX), "email", INVALID_EMAIL);
        v.check_field(not_blank(&self.password), "password", BLANK);
    }
}
