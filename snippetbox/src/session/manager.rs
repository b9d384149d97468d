//! Loading, saving and locking sessions around a request

use super::{Session, SessionError, SessionRecord, SessionStore, SessionToken};
use axum::http::{header::COOKIE, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::task::JoinHandle;

/// Session cookie name
pub const SESSION_COOKIE_NAME: &str = "session";

/// Where session records are kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// In-process map; sessions are lost on restart
    #[default]
    Memory,
    /// The `sessions` table of the application database
    Database,
}

/// SameSite cookie policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    /// Strict same-site policy
    Strict,
    /// Lax same-site policy
    #[default]
    Lax,
    /// No same-site restriction (requires Secure)
    None,
}

impl SameSite {
    /// Cookie attribute value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// Session cookie and lifetime settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookie name for the session token
    pub cookie_name: String,
    /// Send the cookie over HTTPS only
    pub secure: bool,
    /// SameSite policy
    pub same_site: SameSite,
    /// Absolute session lifetime in seconds, counted from creation
    pub lifetime_secs: u64,
    /// Storage backend
    pub backend: SessionBackend,
    /// Seconds between sweeps of expired records
    pub cleanup_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: SESSION_COOKIE_NAME.to_string(),
            secure: false,
            same_site: SameSite::Lax,
            lifetime_secs: 12 * 60 * 60,
            backend: SessionBackend::Memory,
            cleanup_interval_secs: 300,
        }
    }
}

/// Lock for one token and the number of requests holding or awaiting it
#[derive(Debug)]
struct LockEntry {
    lock: Arc<AsyncMutex<()>>,
    users: usize,
}

type LockMap = Mutex<HashMap<SessionToken, LockEntry>>;

/// Exclusive hold on one session token
///
/// Dropping the guard releases the token and forgets its lock once no other
/// request is waiting on it. A wait that is cancelled counts as a release.
#[derive(Debug)]
pub struct TokenGuard {
    token: SessionToken,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockMap>,
}

impl Drop for TokenGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock();
        if let Some(entry) = locks.get_mut(&self.token) {
            entry.users = entry.users.saturating_sub(1);
            if entry.users == 0 {
                locks.remove(&self.token);
            }
        }
    }
}

/// Shared entry point to session storage
///
/// Cheap to clone; every clone shares the store and the lock table.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    config: Arc<SessionConfig>,
    locks: Arc<LockMap>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("store", &"SessionStore")
            .field("locked_tokens", &self.locks.lock().len())
            .finish()
    }
}

impl SessionManager {
    /// Create a manager over `store`
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Cookie and lifetime settings
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Backing store
    #[must_use]
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Wait until no other request holds `token`, then hold it.
    pub async fn lock(&self, token: &SessionToken) -> TokenGuard {
        let lock = {
            let mut locks = self.locks.lock();
            let entry = locks.entry(token.clone()).or_insert_with(|| LockEntry {
                lock: Arc::new(AsyncMutex::new(())),
                users: 0,
            });
            entry.users += 1;
            entry.lock.clone()
        };
        // Created before waiting so a cancelled wait still releases its place.
        let mut held = TokenGuard {
            token: token.clone(),
            guard: None,
            locks: self.locks.clone(),
        };
        held.guard = Some(lock.lock_owned().await);
        held
    }

    /// Session token carried by the request's cookie, if well formed
    #[must_use]
    pub fn token_from_headers(&self, headers: &HeaderMap) -> Option<SessionToken> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|cookie| cookie.trim().split_once('='))
            .find(|(name, _)| name.trim() == self.config.cookie_name)
            .and_then(|(_, value)| SessionToken::parse(value.trim()))
    }

    /// Load the session for `token`.
    ///
    /// Unknown or expired tokens yield a fresh, empty session with no token
    /// and a deadline one lifetime from now.
    pub async fn load(&self, token: Option<SessionToken>) -> Result<Session, SessionError> {
        if let Some(token) = token {
            if let Some(record) = self.store.find(&token).await? {
                return Ok(Session::new(Some(token), record, self.store.clone()));
            }
            tracing::debug!("session token not found or expired, starting a new session");
        }

        let record = SessionRecord::new(Utc::now() + self.lifetime());
        Ok(Session::new(None, record, self.store.clone()))
    }

    /// Persist `session` if it changed.
    ///
    /// Returns the `Set-Cookie` value to send when a record was written.
    pub async fn save(&self, session: &Session) -> Result<Option<String>, SessionError> {
        let Some((token, record)) = session.take_changes() else {
            return Ok(None);
        };
        self.store.commit(&token, &record).await?;
        Ok(Some(self.cookie(&token, record.deadline)))
    }

    /// Build the `Set-Cookie` value for `token`.
    #[must_use]
    pub fn cookie(&self, token: &SessionToken, deadline: DateTime<Utc>) -> String {
        let max_age = (deadline - Utc::now()).num_seconds().max(0);
        let mut cookie = format!(
            "{}={}; Path=/; Expires={}; Max-Age={}; HttpOnly; SameSite={}",
            self.config.cookie_name,
            token,
            deadline.format("%a, %d %b %Y %H:%M:%S GMT"),
            max_age,
            self.config.same_site.as_str(),
        );
        if self.config.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// Sweep expired records from the store every `cleanup_interval_secs`.
    #[must_use]
    pub fn spawn_cleanup(&self) -> JoinHandle<()> {
        let store = self.store.clone();
        let period = std::time::Duration::from_secs(self.config.cleanup_interval_secs.max(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                match store.delete_expired().await {
                    Ok(0) => {}
                    Ok(removed) => tracing::debug!(removed, "removed expired sessions"),
                    Err(e) => tracing::error!(error = %e, "failed to remove expired sessions"),
                }
            }
        })
    }

    fn lifetime(&self) -> Duration {
        Duration::seconds(i64::try_from(self.config.lifetime_secs).unwrap_or(i64::MAX / 1000))
    }

    #[cfg(test)]
    fn held_locks(&self) -> usize {
        self.locks.lock().len()
    }
}
