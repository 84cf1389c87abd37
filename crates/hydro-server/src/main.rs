use anyhow::Result;
use hydro_server::{create_app, logging, state};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let config = state::Config::load()?;

    logging::init(&config)?;

    if config.has_default_jwt_secret() {
        tracing::warn!("jwt_secret not set, using default (insecure for production!)");
    }

    tracing::info!(
        env = %config.env,
        udp_port = config.rtc.udp_port,
        tcp_port = config.rtc.tcp_port,
        "Starting Hydro server..."
    );

    // Build the router
    let (app, app_state) = create_app(config.clone())?;

    // Start the server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!("Listening on {}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down server...");
    app_state.ingest.registry().close_all().await;
    tracing::info!("Server exited properly");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
