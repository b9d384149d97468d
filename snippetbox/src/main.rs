//! snippetbox server binary

use anyhow::Context;
use snippetbox::{config::Config, models, observability, router, state::AppState};
use std::net::SocketAddr;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    observability::init()?;

    let pool = models::connect(&config.database.url, config.database.max_connections)
        .await
        .with_context(|| format!("failed to open database {}", config.database.url))?;

    let addr = config.server.addr;
    let state = AppState::build(config, pool)?;
    let _cleanup = state.sessions().spawn_cleanup();
    let app = router::routes(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "starting server");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
