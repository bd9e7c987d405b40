use anyhow::Context;
use tracing_subscriber::EnvFilter;

use boards::{
    config::Settings,
    controllers::{create_router, AppState},
    db::connection::establish_connection,
    notifications,
    services::BoardService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env()?;

    let pool = establish_connection(&settings.database)
        .with_context(|| format!("failed to open database {}", settings.database.url))?;
    let board_service = BoardService::new(pool, settings.move_depth_check);

    let notification_sender = notifications::channel();
    let heartbeat =
        notifications::spawn_heartbeat(notification_sender.clone(), settings.notification_interval);

    let state = AppState {
        boards: board_service,
        notifications: notification_sender,
    };
    let app = create_router(state, &settings.cors_allow_origins);

    let listener = tokio::net::TcpListener::bind(settings.app_url)
        .await
        .with_context(|| format!("failed to bind {}", settings.app_url))?;
    tracing::info!(
        address = %settings.app_url,
        move_depth_check = ?settings.move_depth_check,
        "Boards service listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    heartbeat.abort();
    tracing::info!("Boards service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
