//! Application state shared by every handler
//!
//! Built once at startup and never mutated afterwards. Every field is behind
//! an `Arc` (or is itself a cheap handle), so cloning per request is cheap.

use crate::auth::password::PasswordHasher;
use crate::config::Config;
use crate::forms::FormCodec;
use crate::models::{SnippetStore, SqliteSnippetStore, SqliteUserStore, UserStore};
use crate::session::{
    MemorySessionStore, SessionBackend, SessionManager, SessionStore, SqliteSessionStore,
};
use crate::template::{TemplateCache, TemplateError};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Handler dependencies
///
/// # Example
///
/// ```rust,no_run
/// use snippetbox::{config::Config, state::AppState};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::load()?;
/// let pool = snippetbox::models::connect(&config.database.url, 5).await?;
/// let state = AppState::build(config, pool)?;
/// let app = snippetbox::router::routes(state);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AppState {
    snippets: Arc<dyn SnippetStore>,
    users: Arc<dyn UserStore>,
    templates: Arc<TemplateCache>,
    sessions: SessionManager,
    forms: FormCodec,
    config: Arc<Config>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("templates", &self.templates)
            .field("sessions", &self.sessions)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Assemble state from already constructed parts
    #[must_use]
    pub fn new(
        config: Config,
        snippets: Arc<dyn SnippetStore>,
        users: Arc<dyn UserStore>,
        templates: TemplateCache,
        sessions: SessionManager,
    ) -> Self {
        Self {
            snippets,
            users,
            templates: Arc::new(templates),
            sessions,
            forms: FormCodec::new(),
            config: Arc::new(config),
        }
    }

    /// Build the SQLite stores, the session manager and the template cache.
    ///
    /// `pool` must already be migrated.
    pub fn build(config: Config, pool: SqlitePool) -> Result<Self, TemplateError> {
        let templates = TemplateCache::build(&config.templates.dir)?;
        tracing::info!(pages = templates.len(), "template cache built");

        let session_store: Arc<dyn SessionStore> = match config.session.backend {
            SessionBackend::Memory => Arc::new(MemorySessionStore::new()),
            SessionBackend::Database => Arc::new(SqliteSessionStore::new(pool.clone())),
        };
        let sessions = SessionManager::new(session_store, config.session.clone());

        let hasher = PasswordHasher::with_config(config.password.clone());
        let snippets = Arc::new(SqliteSnippetStore::new(pool.clone()));
        let users = Arc::new(SqliteUserStore::new(pool, hasher));

        Ok(Self::new(config, snippets, users, templates, sessions))
    }

    /// Snippet store
    #[must_use]
    pub fn snippets(&self) -> &dyn SnippetStore {
        self.snippets.as_ref()
    }

    /// User store
    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    /// Composed page templates
    #[must_use]
    pub fn templates(&self) -> &TemplateCache {
        &self.templates
    }

    /// Session manager
    #[must_use]
    pub const fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Form decoder
    #[must_use]
    pub const fn forms(&self) -> &FormCodec {
        &self.forms
    }

    /// Configuration the state was built from
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}
