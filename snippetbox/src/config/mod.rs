//! Layered configuration
//!
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. `./config.toml` (or the file passed to [`Config::load_from`])
//! 3. Environment variables prefixed `SNIPPETBOX_`, with `__` separating
//!    nested keys (`SNIPPETBOX_SERVER__ADDR=0.0.0.0:4000`)
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! addr = "127.0.0.1:4000"
//!
//! [database]
//! url = "sqlite://snippetbox.db?mode=rwc"
//! max_connections = 5
//!
//! [templates]
//! dir = "./ui/html"
//!
//! [static_files]
//! dir = "./ui/static"
//!
//! [session]
//! lifetime_secs = 43200
//! secure = false
//! same_site = "lax"
//! backend = "database"
//! ```

use crate::auth::password::PasswordHashConfig;
use crate::session::SessionConfig;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "SNIPPETBOX_";

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address to bind
    pub addr: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 4000)),
        }
    }
}

/// Database settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite connection URL
    pub url: String,
    /// Upper bound on pooled connections
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://snippetbox.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

/// A directory setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirSettings {
    /// Directory path
    pub dir: PathBuf,
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener
    pub server: ServerSettings,
    /// Database
    pub database: DatabaseSettings,
    /// Template root holding `base.html`, `partials/` and `pages/`
    pub templates: DirSettings,
    /// Files served under `/static/`
    pub static_files: DirSettings,
    /// Session cookie and storage
    pub session: SessionConfig,
    /// Password hashing cost
    pub password: PasswordHashConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            database: DatabaseSettings::default(),
            templates: DirSettings {
                dir: PathBuf::from("./ui/html"),
            },
            static_files: DirSettings {
                dir: PathBuf::from("./ui/static"),
            },
            session: SessionConfig::default(),
            password: PasswordHashConfig::default(),
        }
    }
}

impl Config {
    /// Load defaults, then `./config.toml` if present, then the environment.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from("./config.toml")
    }

    /// Load defaults, then `path` if present, then the environment.
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::new().merge(Toml::string(&toml::to_string(&Self::default())?));

        let path = path.as_ref();
        if path.exists() {
            figment = figment.merge(Toml::file(path));
        }

        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true))
            .extract()?;
        Ok(config)
    }
}
