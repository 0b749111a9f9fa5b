use anyhow::Context;
use axum::{extract::DefaultBodyLimit, http::HeaderValue, Router};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use clearance_api::auth::TokenCodec;
use clearance_api::config::{AppConfig, DEV_JWT_SECRET};
use clearance_api::database::DatabaseManager;
use clearance_api::handlers::{self, AppState};
use clearance_api::security::{
    AccessClaimGate, BroadcastNotifier, HttpPermissionGate, PermissionGate, PgDirectory,
    PgSecurityStore, SecurityService,
};

#[derive(Parser)]
#[command(name = "clearance-api")]
#[command(about = "Security level service - classification, grants and access checks")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<ServerCommand>,
}

#[derive(Subcommand)]
enum ServerCommand {
    /// Run the HTTP server (default)
    Serve,
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL etc. are picked up
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = clearance_api::config::config();
    config.validate().map_err(anyhow::Error::msg)?;

    match args.command.unwrap_or(ServerCommand::Serve) {
        ServerCommand::Migrate => migrate(config).await,
        ServerCommand::Serve => serve(config).await,
    }
}

async fn migrate(config: &AppConfig) -> anyhow::Result<()> {
    let db = DatabaseManager::connect(&config.database).await?;
    db.migrate().await?;
    db.close().await;
    Ok(())
}

async fn serve(config: &AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting Clearance API in {:?} mode", config.environment);
    if clearance_api::is_development!() && config.security.jwt_secret == DEV_JWT_SECRET {
        tracing::warn!("Using the built-in development JWT secret");
    }

    let db = DatabaseManager::connect(&config.database).await?;
    db.health_check().await.context("database is not reachable")?;
    let pool = db.pool().clone();

    let gate: Arc<dyn PermissionGate> = match &config.permissions.service_url {
        Some(url) => {
            tracing::info!("Using permission service at {}", url);
            Arc::new(HttpPermissionGate::new(
                url,
                Duration::from_secs(config.permissions.timeout_secs),
            )?)
        }
        None => {
            if clearance_api::is_production!() {
                tracing::warn!("PERMISSIONS_SERVICE_URL unset in production, authorizing from access claims");
            }
            tracing::info!("No permission service configured, authorizing from access claims");
            Arc::new(AccessClaimGate)
        }
    };

    let notifier = Arc::new(BroadcastNotifier::new(config.events.channel_capacity));
    let service = SecurityService::new(
        Arc::new(PgSecurityStore::new(pool.clone())),
        Arc::new(PgDirectory::new(pool)),
        gate,
        notifier,
    );
    let codec = TokenCodec::new(&config.security.jwt_secret, config.security.jwt_expiry_hours)?;

    let app = app(config, AppState::new(service, codec))?;

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Clearance API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    Ok(())
}

fn app(config: &AppConfig, state: AppState) -> anyhow::Result<Router> {
    let mut app = handlers::router(state).layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    if config.api.enable_request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }

    if config.security.enable_cors {
        let origins = config
            .security
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .context("invalid SECURITY_CORS_ORIGINS entry")?;
        app = app.layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    Ok(app)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
