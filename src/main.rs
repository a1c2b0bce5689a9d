//! GhostPath service entrypoint: load configuration, stand up logging and
//! the store connection pool, and serve the HTTP surface.

use std::sync::Arc;

use ghostpath::http::{router, AppState};
use ghostpath::{Settings, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    ghostpath::logging::setup(&settings.log_level, settings.log_format)?;

    let store = Store::connect(
        &settings.database_url,
        settings.db_pool_max_connections,
        settings.db_pool_min_connections,
        settings.db_pool_acquire_timeout,
    )
    .await?;

    let settings = Arc::new(settings);
    let state = AppState::new(Arc::new(store), settings.clone());
    let app = router(state);

    tracing::info!(addr = %settings.http_bind_addr, "starting GhostPath");
    let listener = tokio::net::TcpListener::bind(settings.http_bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
