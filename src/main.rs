use anyhow::Result;
use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use device_telemetry_service::{
    api::{self, AppState},
    config::Config,
    db,
    devices::DeviceStateService,
    readings::ReadingService,
    retention::RetentionService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env (ignore error if file absent — env vars may be set externally)
    let _ = dotenvy::dotenv();

    // Initialise tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    // Load config
    let config = Config::from_env()?;

    // Build the process-wide pool. The pool is lazy, so a database that is
    // unreachable right now is logged but does not stop the server: every
    // request will just fail with a 500 until it comes back.
    let pool = db::create_pool(&config.database_url)?;
    match db::run_migrations(&pool).await {
        Ok(()) => info!("Database ready"),
        Err(e) => error!(error = %e, "Database unavailable at startup; continuing anyway"),
    }

    let devices = DeviceStateService::new(pool.clone());
    let readings = ReadingService::new(pool);

    // Spawn the retention purge loop; its first cycle runs immediately.
    {
        let retention = RetentionService::new(readings.clone(), config.purge_interval_secs);
        tokio::spawn(retention.run());
    }

    // Start HTTP server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, api::router(AppState { devices, readings }))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
