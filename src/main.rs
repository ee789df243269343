use chatrelay::{config::Config, db::MessageStore, presence::PresenceRegistry, AppState, ConversationService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = MessageStore::connect(&config.database_url, config.database_max_connections)
        .await
        .map_err(|err| err.0)?;
    store.init_schema().await.map_err(|err| err.0)?;
    tracing::info!("message store ready");

    let app = chatrelay::router(AppState {
        service: ConversationService::new(PresenceRegistry::new(), store),
    });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "chat relay listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
