//! SQLite-backed stores

use super::{ModelError, Snippet, SnippetStore, UserStore, LATEST_LIMIT};
use crate::auth::password::PasswordHasher;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::SqlitePool;

/// Snippets in the `snippets` table
#[derive(Debug, Clone)]
pub struct SqliteSnippetStore {
    pool: SqlitePool,
}

impl SqliteSnippetStore {
    /// Wrap a pool whose schema has been migrated
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnippetStore for SqliteSnippetStore {
    async fn insert(
        &self,
        title: &str,
        content: &str,
        expires_days: i64,
    ) -> Result<i64, ModelError> {
        let created = Utc::now();
        let expires = created + Duration::days(expires_days);

        let result = sqlx::query(
            "INSERT INTO snippets (title, content, created, expires) VALUES (?, ?, ?, ?)",
        )
        .bind(title)
        .bind(content)
        .bind(created)
        .bind(expires)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn get(&self, id: i64) -> Result<Snippet, ModelError> {
        sqlx::query_as::<_, Snippet>(
            "SELECT id, title, content, created, expires FROM snippets \
             WHERE expires > ? AND id = ?",
        )
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ModelError::NoRecord)
    }

    async fn latest(&self) -> Result<Vec<Snippet>, ModelError> {
        let snippets = sqlx::query_as::<_, Snippet>(
            "SELECT id, title, content, created, expires FROM snippets \
             WHERE expires > ? ORDER BY id DESC LIMIT ?",
        )
        .bind(Utc::now())
        .bind(LATEST_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(snippets)
    }
}

/// User accounts in the `users` table
#[derive(Debug, Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
    hasher: PasswordHasher,
}

impl SqliteUserStore {
    /// Wrap a pool whose schema has been migrated
    #[must_use]
    pub const fn new(pool: SqlitePool, hasher: PasswordHasher) -> Self {
        Self { pool, hasher }
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn insert(&self, name: &str, email: &str, password: &str) -> Result<i64, ModelError> {
        let hashed = self.hasher.hash(password)?;

        let result = sqlx::query(
            "INSERT INTO users (name, email, hashed_password, created) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(email)
        .bind(hashed)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => ModelError::DuplicateEmail,
            other => ModelError::Database(other),
        })?;

        Ok(result.last_insert_rowid())
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<i64, ModelError> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT id, hashed_password FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        let Some((id, hashed)) = row else {
            return Err(ModelError::InvalidCredentials);
        };

        if self.hasher.verify(password, &hashed)? {
            Ok(id)
        } else {
            Err(ModelError::InvalidCredentials)
        }
    }

    async fn exists(&self, id: i64) -> Result<bool, ModelError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::PasswordHashConfig;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!().run(&pool).await.unwrap();
        pool
    }

    fn hasher() -> PasswordHasher {
        PasswordHasher::with_config(PasswordHashConfig {
            memory_cost: 1024,
            iterations: 1,
            parallelism: 1,
        })
    }

    #[tokio::test]
    async fn test_snippet_insert_and_get() {
        let store = SqliteSnippetStore::new(pool().await);
        let id = store.insert("An old silent pond", "A frog jumps in", 7).await.unwrap();
        assert!(id >= 1);

        let snippet = store.get(id).await.unwrap();
        assert_eq!(snippet.title, "An old silent pond");
        assert_eq!((snippet.expires - snippet.created).num_days(), 7);
        assert!(matches!(store.get(id + 1).await, Err(ModelError::NoRecord)));
    }

    #[tokio::test]
    async fn test_expired_snippets_are_hidden() {
        let pool = pool().await;
        let store = SqliteSnippetStore::new(pool.clone());
        let id = store.insert("gone", "soon", 1).await.unwrap();
        sqlx::query("UPDATE snippets SET expires = ? WHERE id = ?")
            .bind(Utc::now() - Duration::minutes(1))
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();

        assert!(matches!(store.get(id).await, Err(ModelError::NoRecord)));
        assert!(store.latest().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_latest_is_newest_first_and_limited() {
        let store = SqliteSnippetStore::new(pool().await);
        for i in 0..12 {
            store.insert(&format!("snippet {i}"), "body", 365).await.unwrap();
        }
        let latest = store.latest().await.unwrap();
        assert_eq!(latest.len(), 10);
        assert_eq!(latest[0].title, "snippet 11");
        assert_eq!(latest[9].title, "snippet 2");
    }

    #[tokio::test]
    async fn test_user_signup_and_authenticate() {
        let store = SqliteUserStore::new(pool().await, hasher());
        let id = store
            .insert("Alice", "alice@example.com", "pa55word!")
            .await
            .unwrap();

        assert_eq!(
            store.authenticate("alice@example.com", "pa55word!").await.unwrap(),
            id
        );
        assert!(matches!(
            store.authenticate("alice@example.com", "wrong").await,
            Err(ModelError::InvalidCredentials)
        ));
        assert!(matches!(
            store.authenticate("bob@example.com", "pa55word!").await,
            Err(ModelError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let store = SqliteUserStore::new(pool().await, hasher());
        store.insert("Alice", "alice@example.com", "pa55word!").await.unwrap();
        assert!(matches!(
            store.insert("Alice 2", "alice@example.com", "pa55word!").await,
            Err(ModelError::DuplicateEmail)
        ));
    }

    #[tokio::test]
    async fn test_exists() {
        let store = SqliteUserStore::new(pool().await, hasher());
        let id = store.insert("Alice", "alice@example.com", "pa55word!").await.unwrap();
        assert!(store.exists(id).await.unwrap());
        assert!(!store.exists(id + 100).await.unwrap());
    }
}
