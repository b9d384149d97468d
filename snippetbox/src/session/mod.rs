//! Server-side sessions keyed by an opaque cookie token
//!
//! A [`Session`] is loaded by the session middleware before a dynamic route
//! runs and is placed in the request extensions. Handlers read and change it
//! through the [`Session`] extractor; the middleware persists it afterwards
//! if anything changed.
//!
//! ```rust,ignore
//! use snippetbox::session::Session;
//!
//! async fn handler(session: Session) {
//!     session.put("flash", "Saved!")?;
//!     let flash = session.pop_string("flash"); // Some("Saved!"), then gone
//! }
//! ```

pub mod manager;
pub mod store;

pub use manager::{SameSite, SessionBackend, SessionConfig, SessionManager, TokenGuard};
pub use store::{MemorySessionStore, SessionStore, SqliteSessionStore};

use crate::error::AppError;
use axum::{extract::FromRequestParts, http::request::Parts};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::Rng;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Opaque session identifier carried in the session cookie
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a token from 32 bytes of OS-seeded randomness
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Accept a token presented by a client.
    ///
    /// Returns `None` unless the value has the shape of a generated token.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let well_formed = value.len() == 43
            && value
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        well_formed.then(|| Self(value.to_string()))
    }

    /// The token as sent in the cookie
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted state of one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Key/value data written by handlers
    pub data: HashMap<String, serde_json::Value>,
    /// Absolute expiry; the record is discarded after this instant
    pub deadline: DateTime<Utc>,
}

impl SessionRecord {
    /// Empty record that expires at `deadline`
    #[must_use]
    pub fn new(deadline: DateTime<Utc>) -> Self {
        Self {
            data: HashMap::new(),
            deadline,
        }
    }

    /// True once the deadline has passed
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.deadline
    }
}

/// Session-related errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session middleware did not run for this request
    #[error("session not loaded for this request")]
    NotLoaded,

    /// A value could not be converted to or from JSON
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing database failed
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Unmodified,
    Modified,
}

#[derive(Debug)]
struct State {
    token: Option<SessionToken>,
    record: SessionRecord,
    status: Status,
}

/// Handle to the current request's session
///
/// Clones share the same state, so changes made by a handler are visible to
/// the middleware that commits them.
#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<State>>,
    store: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("store", &"SessionStore")
            .finish()
    }
}

impl Session {
    pub(crate) fn new(
        token: Option<SessionToken>,
        record: SessionRecord,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                token,
                record,
                status: Status::Unmodified,
            })),
            store,
        }
    }

    /// Read `key`, converting it to `T`.
    ///
    /// Missing keys and values of another type both yield `None`.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let state = self.state.lock();
        state
            .record
            .data
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// True if `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().record.data.contains_key(key)
    }

    /// Store `value` under `key`.
    pub fn put<T: Serialize>(&self, key: &str, value: T) -> Result<(), SessionError> {
        let value = serde_json::to_value(value)?;
        let mut state = self.state.lock();
        state.record.data.insert(key.to_string(), value);
        state.status = Status::Modified;
        Ok(())
    }

    /// Read a string value and remove it in the same step.
    #[must_use]
    pub fn pop_string(&self, key: &str) -> Option<String> {
        let mut state = self.state.lock();
        let value = state.record.data.remove(key)?;
        state.status = Status::Modified;
        match value {
            serde_json::Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Delete `key` if present.
    pub fn remove(&self, key: &str) {
        let mut state = self.state.lock();
        if state.record.data.remove(key).is_some() {
            state.status = Status::Modified;
        }
    }

    /// Move the session to a fresh token and delete the old one from the store.
    ///
    /// All data is kept. Call this whenever the authentication state changes.
    pub async fn renew_token(&self) -> Result<(), SessionError> {
        let previous = {
            let mut state = self.state.lock();
            state.status = Status::Modified;
            state.token.replace(SessionToken::generate())
        };
        if let Some(previous) = previous {
            self.store.delete(&previous).await?;
        }
        Ok(())
    }

    /// The token this session will be saved under, if it has one yet.
    #[must_use]
    pub fn token(&self) -> Option<SessionToken> {
        self.state.lock().token.clone()
    }

    /// Absolute expiry of the session
    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.state.lock().record.deadline
    }

    /// If the session changed, make sure it has a token and return what to save.
    pub(crate) fn take_changes(&self) -> Option<(SessionToken, SessionRecord)> {
        let mut state = self.state.lock();
        if state.status == Status::Unmodified {
            return None;
        }
        state.status = Status::Unmodified;
        let token = state.token.get_or_insert_with(SessionToken::generate).clone();
        Some((token, state.record.clone()))
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| AppError::from(SessionError::NotLoaded))
    }
}
