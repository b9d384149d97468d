//! Snippet and user persistence
//!
//! Handlers only see the [`SnippetStore`] and [`UserStore`] traits; the
//! SQLite implementations live in [`sqlite`].

pub mod sqlite;

pub use sqlite::{SqliteSnippetStore, SqliteUserStore};

use crate::auth::password::PasswordError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{migrate::Migrator, sqlite::SqlitePoolOptions, SqlitePool};
use thiserror::Error;

/// Embedded schema migrations for `snippets`, `users` and `sessions`
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Number of snippets shown on the home page
pub const LATEST_LIMIT: i64 = 10;

/// Open a pool on `url` and bring its schema up to date.
pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await?;
    MIGRATOR.run(&pool).await?;
    Ok(pool)
}

/// A stored text snippet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Snippet {
    /// Row id, always at least 1
    pub id: i64,
    /// Title
    pub title: String,
    /// Body
    pub content: String,
    /// Creation time
    pub created: DateTime<Utc>,
    /// The snippet is hidden after this time
    pub expires: DateTime<Utc>,
}

/// Store failures
#[derive(Debug, Error)]
pub enum ModelError {
    /// No live record matched
    #[error("no matching record found")]
    NoRecord,

    /// The email address already belongs to an account
    #[error("duplicate email")]
    DuplicateEmail,

    /// Unknown email or wrong password
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password hashing failed
    #[error(transparent)]
    Password(#[from] PasswordError),

    /// The database failed
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Snippet persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnippetStore: Send + Sync {
    /// Store a snippet that expires `expires_days` from now, returning its id.
    async fn insert(&self, title: &str, content: &str, expires_days: i64)
        -> Result<i64, ModelError>;

    /// Fetch a live snippet, or [`ModelError::NoRecord`].
    async fn get(&self, id: i64) -> Result<Snippet, ModelError>;

    /// The most recently created live snippets, newest first.
    async fn latest(&self) -> Result<Vec<Snippet>, ModelError>;
}

/// User account persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create an account, returning its id.
    ///
    /// Fails with [`ModelError::DuplicateEmail`] if the email is taken.
    async fn insert(&self, name: &str, email: &str, password: &str) -> Result<i64, ModelError>;

    /// Check credentials, returning the user's id.
    ///
    /// Fails with [`ModelError::InvalidCredentials`] for an unknown email or a
    /// wrong password.
    async fn authenticate(&self, email: &str, password: &str) -> Result<i64, ModelError>;

    /// True if an account with `id` exists.
    async fn exists(&self, id: i64) -> Result<bool, ModelError>;
}
