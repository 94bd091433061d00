use anyhow::{Context, Result};
use dbpanel::api::{create_router, AppState};
use dbpanel::broker::MongoConnector;
use dbpanel::config::{load_config_or_default, Secrets};
use dbpanel::credentials::CredentialCodec;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dbpanel=info".into()),
        )
        .init();

    info!("dbpanel starting...");

    let config_path =
        std::env::var("DBPANEL_CONFIG").unwrap_or_else(|_| "dbpanel.toml".to_string());
    let mut config = load_config_or_default(&config_path)?;
    config.apply_env(|name| std::env::var(name).ok());

    // Refuse to start without a usable token key
    let secrets = Secrets::from_env().context("Failed to load secrets")?;

    info!(
        config_path = %config_path,
        bind_addr = %config.server.bind_addr(),
        auth_source = %config.database.auth_source,
        connect_timeout_secs = config.database.connect_timeout_secs,
        "Configuration loaded"
    );

    let state = AppState {
        codec: Arc::new(CredentialCodec::new(secrets.token_key)),
        connector: Arc::new(MongoConnector::new(config.database.clone())),
        default_user_password: secrets.default_user_password,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.bind_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr()))?;
    info!(addr = %config.server.bind_addr(), "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("dbpanel stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl_c signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
