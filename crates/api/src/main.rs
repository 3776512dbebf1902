use anyhow::Result;
use settings_admin_api::{app, config, middleware};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = config::Config::load()?;

    middleware::logging::init_logging(&config.logging)?;
    middleware::init_metrics()?;

    info!("Starting Settings Admin API v{}", env!("CARGO_PKG_VERSION"));

    let addr = config.socket_addr()?;
    let services = app::init_services(config).await?;
    info!(source = ?services.load_source, "Settings engine ready");

    let app = app::create_app(services.state.clone());

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Flush pending edits before exit
    let status = services.state.controller.lock().await.save().await;
    info!(status = ?status, "Final save on shutdown");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
