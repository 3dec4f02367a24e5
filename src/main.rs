use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use deck_api::auth::{verifier_from_config, ProviderIdentityResolver};
use deck_api::config::{self, StoreBackend};
use deck_api::database::{DatabaseManager, MemoryStore, PgStore, Store};
use deck_api::{create_router, is_production, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL and CLERK_JWT_SECRET
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("deck_api=info,tower_http=info")),
        )
        .init();

    let config = config::config();
    tracing::info!("Starting deck API in {:?} mode", config.environment);

    let mut pool = None;
    let store: Arc<dyn Store> = match config.database.backend {
        StoreBackend::Memory => {
            if is_production!() {
                bail!("the memory store backend cannot be used in production");
            }
            tracing::warn!("Using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Postgres => {
            let pg = DatabaseManager::connect(&config.database)
                .await
                .context("connecting to database")?;
            if config.database.bootstrap_schema {
                DatabaseManager::bootstrap_schema(&pg).await?;
            }
            pool = Some(pg.clone());
            Arc::new(PgStore::new(pg))
        }
    };

    let verifier = verifier_from_config(&config.identity)
        .context("set CLERK_JWT_SECRET or CLERK_JWKS_URL")?;
    let resolver = ProviderIdentityResolver::new(verifier, store.clone())
        .with_auto_provision(config.identity.auto_provision);

    let state = AppState::new(store, Arc::new(resolver));
    let mut app = create_router(state)
        .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
        .layer(RequestBodyLimitLayer::new(config.server.max_request_size_bytes));
    if config.server.enable_request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }

    let bind_addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid HOST/PORT")?;
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!(address = %bind_addr, "Deck API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        DatabaseManager::close(pool).await;
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
