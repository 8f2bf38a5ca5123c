use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

pub mod config;
pub mod content_type;
pub mod error;
pub mod ids;
pub mod middleware;
pub mod pagination;
pub mod repository;
pub mod routes;
pub mod stats;
pub mod validation;

pub use repository::{RepositoryError, ScriptRepository};
pub use routes::AppState;

/// Starts the web server with configuration taken from `SCRIPTBIN_*`
/// environment variables.
pub async fn start_server(shutdown_rx: oneshot::Receiver<()>) -> anyhow::Result<u16> {
    start_server_with_config(config::Config::from_env()?, shutdown_rx).await
}

/// Starts the web server with custom configuration.
///
/// The server runs on a background task until `shutdown_rx` fires or its
/// sender is dropped. Returns the bound port, which matters when the
/// configured port is 0.
pub async fn start_server_with_config(
    config: config::Config,
    shutdown_rx: oneshot::Receiver<()>,
) -> anyhow::Result<u16> {
    config.validate()?;

    let state = AppState::new(&config);
    let app = routes::build_router(state, config.static_dir.as_deref());

    let listener = TcpListener::bind(config.server_addr())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", config.server_addr(), e))?;
    let local_addr = listener.local_addr()?;

    info!("listening on {}", local_addr);
    debug!("Server configuration: {:?}", config);

    tokio::spawn(async move {
        let shutdown = async {
            let _ = shutdown_rx.await;
            info!("shutdown requested, no longer accepting connections");
        };

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!("server error: {}", e);
        }
    });

    Ok(local_addr.port())
}
