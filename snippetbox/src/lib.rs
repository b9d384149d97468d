//! # snippetbox
//!
//! A server-rendered web application for sharing short text snippets.
//!
//! Every request passes through a standard middleware chain (panic recovery,
//! request logging, security headers). Page routes add a dynamic chain on top:
//! a server-side session is loaded and saved around the handler, and the
//! authenticated user is resolved from it.
//!
//! ## Layout
//!
//! - [`config`]: figment layering of defaults, `config.toml` and environment
//! - [`observability`]: tracing subscriber setup
//! - [`session`]: tokens, records, stores and the per-request [`session::Session`]
//! - [`middleware`]: the tower layers and `from_fn` middleware above
//! - [`template`]: the page composition cache
//! - [`forms`]: form decoding and validation
//! - [`models`]: snippet and user persistence on SQLite
//! - [`handlers`] and [`router`]: the pages and the route table
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use snippetbox::{config::Config, models, router, state::AppState};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let pool = models::connect(&config.database.url, config.database.max_connections).await?;
//! let state = AppState::build(config, pool)?;
//! let app = router::routes(state);
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

#![allow(clippy::missing_errors_doc)]

pub mod auth;
pub mod config;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod router;
pub mod session;
pub mod state;
pub mod template;

/// Common imports for wiring the application together
pub mod prelude {
    pub use crate::auth::AuthContext;
    pub use crate::config::Config;
    pub use crate::error::AppError;
    pub use crate::router::routes;
    pub use crate::session::{Session, SessionManager};
    pub use crate::state::AppState;
}
