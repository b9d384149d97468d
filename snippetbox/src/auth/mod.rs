//! Per-request authentication state
//!
//! [`AuthContext`] is computed fresh for every dynamic request by the
//! authenticate middleware from the session's [`AUTHENTICATED_USER_ID`] key.
//! Handlers take it as an extractor:
//!
//! ```rust,no_run
//! use snippetbox::auth::AuthContext;
//!
//! async fn whoami(auth: AuthContext) -> String {
//!     match auth.user_id() {
//!         Some(id) => format!("user {id}"),
//!         None => "anonymous".to_string(),
//!     }
//! }
//! ```

pub mod password;

use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

/// Session key holding the logged-in user's id
pub const AUTHENTICATED_USER_ID: &str = "authenticatedUserID";

/// Whether the current request belongs to a logged-in user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthContext {
    /// No user, or the session's user no longer exists
    #[default]
    Anonymous,
    /// A user whose account exists
    Authenticated {
        /// Id of the logged-in user
        user_id: i64,
    },
}

impl AuthContext {
    /// True for a logged-in user
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    /// Id of the logged-in user, if any
    #[must_use]
    pub const fn user_id(&self) -> Option<i64> {
        match self {
            Self::Authenticated { user_id } => Some(*user_id),
            Self::Anonymous => None,
        }
    }
}

/// Requests that skipped the authenticate middleware are anonymous.
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().copied().unwrap_or_default())
    }
}
