use anyhow::Result;
use todo_core::{open_store, Config, TodoService};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    tracing::info!(environment = %config.environment, "Starting todo server");

    let store = open_store(&config).await.inspect_err(|e| {
        tracing::error!(error = %e, "Failed to start server");
    })?;
    let router = todo_server::app(TodoService::new(store.clone()), config.environment);

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{addr}");
    tracing::info!("Health check: http://{addr}/api/health");

    todo_server::run(listener, router, shutdown()).await?;

    store.close().await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping server...");
}
