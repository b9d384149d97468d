//! Structured logging
//!
//! Pretty, human-readable output in debug builds; one JSON object per event
//! in release builds. `RUST_LOG` overrides the default filter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset
#[must_use]
pub fn default_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "info,snippetbox=debug"
    } else {
        "info"
    }
}

/// Install the global tracing subscriber.
///
/// Fails if a global subscriber is already installed.
///
/// ```rust,no_run
/// # fn main() -> anyhow::Result<()> {
/// snippetbox::observability::init()?;
/// tracing::info!("starting server");
/// # Ok(())
/// # }
/// ```
pub fn init() -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter()));

    #[cfg(debug_assertions)]
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().pretty())
        .try_init()?;

    #[cfg(not(debug_assertions))]
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()?;

    Ok(())
}
