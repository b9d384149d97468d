//! Session persistence backends

use super::{SessionError, SessionRecord, SessionToken};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sqlx::SqlitePool;
use std::collections::HashMap;

/// Storage for session records keyed by token
///
/// Implementations never return a record whose deadline has passed.
///
/// # Examples
///
/// ```rust
/// use snippetbox::session::{MemorySessionStore, SessionRecord, SessionStore, SessionToken};
///
/// # async fn example() -> anyhow::Result<()> {
/// let store = MemorySessionStore::new();
/// let token = SessionToken::generate();
/// let record = SessionRecord::new(chrono::Utc::now() + chrono::Duration::hours(12));
///
/// store.commit(&token, &record).await?;
/// assert!(store.find(&token).await?.is_some());
///
/// store.delete(&token).await?;
/// assert!(store.find(&token).await?.is_none());
/// # Ok(())
/// # }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the live record for `token`, if any.
    async fn find(&self, token: &SessionToken) -> Result<Option<SessionRecord>, SessionError>;

    /// Insert or replace the record for `token`.
    async fn commit(&self, token: &SessionToken, record: &SessionRecord)
        -> Result<(), SessionError>;

    /// Remove the record for `token`. Deleting an unknown token is not an error.
    async fn delete(&self, token: &SessionToken) -> Result<(), SessionError>;

    /// Remove every expired record, returning how many were removed.
    async fn delete_expired(&self) -> Result<u64, SessionError>;
}

/// In-process session store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    records: RwLock<HashMap<SessionToken, SessionRecord>>,
}

impl MemorySessionStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held, expired or not
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// True if no records are held
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn find(&self, token: &SessionToken) -> Result<Option<SessionRecord>, SessionError> {
        Ok(self
            .records
            .read()
            .get(token)
            .filter(|record| !record.is_expired())
            .cloned())
    }

    async fn commit(
        &self,
        token: &SessionToken,
        record: &SessionRecord,
    ) -> Result<(), SessionError> {
        self.records.write().insert(token.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, token: &SessionToken) -> Result<(), SessionError> {
        self.records.write().remove(token);
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, SessionError> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, record| !record.is_expired());
        Ok((before - records.len()) as u64)
    }
}

/// Session store backed by the `sessions` table
///
/// The record is stored as JSON; the deadline is also kept as a unix
/// timestamp so expiry can be filtered in SQL.
#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Wrap a pool whose schema has been migrated
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn find(&self, token: &SessionToken) -> Result<Option<SessionRecord>, SessionError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT data FROM sessions WHERE token = ? AND expiry > ?")
                .bind(token.as_str())
                .bind(Utc::now().timestamp())
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((data,)) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn commit(
        &self,
        token: &SessionToken,
        record: &SessionRecord,
    ) -> Result<(), SessionError> {
        let data = serde_json::to_string(record)?;
        sqlx::query(
            "INSERT INTO sessions (token, data, expiry) VALUES (?, ?, ?) \
             ON CONFLICT(token) DO UPDATE SET data = excluded.data, expiry = excluded.expiry",
        )
        .bind(token.as_str())
        .bind(data)
        .bind(expiry(record.deadline))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, token: &SessionToken) -> Result<(), SessionError> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, SessionError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expiry <= ?")
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn expiry(deadline: DateTime<Utc>) -> i64 {
    deadline.timestamp()
}
