use actix::prelude::*;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod actors;
mod api;
mod config;
mod domain;
mod metrics;
mod store;
mod utils;

use actors::HealthMonitorActor;
use api::AppState;
use config::Config;
use domain::order::{OrderCommandHandler, OrderQueryService};
use store::{OrderStore, PgOrderStore};
use utils::{retry_on_transient, RetryConfig};

#[actix::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_service=debug")),
        )
        .init();

    tracing::info!("🚀 Starting order service");

    // === 1. Configuration ===
    let config = Config::from_env().context("Invalid configuration")?;

    // === 2. Connect to PostgreSQL and apply migrations ===
    let pool = connect(&config).await?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("✅ Database migrations applied");

    // === 3. Initialize Prometheus metrics ===
    let metrics = Arc::new(metrics::Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 4. Order core ===
    let store: Arc<dyn OrderStore> = Arc::new(PgOrderStore::new(pool));
    let commands = OrderCommandHandler::new(store.clone(), metrics.clone(), config.command_settings());
    let queries = OrderQueryService::new(
        store.clone(),
        metrics.clone(),
        config.page_limits(),
        config.request_timeout,
    );

    if config.restock_on_delete {
        tracing::info!("Deleting an order returns its quantities to inventory");
    }

    // === 5. Health monitor ===
    let health = HealthMonitorActor::new(store, metrics.clone(), config.health_check_interval).start();

    // === 6. HTTP server ===
    let state = AppState {
        commands,
        queries,
        health,
    };
    let registry = metrics.registry().clone();
    let bind = config.bind_address();

    tracing::info!(host = %bind.0, port = bind.1, base_path = api::BASE_PATH, "🌐 Serving HTTP");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .configure(api::configure(state.clone(), registry.clone()))
    })
    .bind(bind.clone())
    .with_context(|| format!("Failed to bind {}:{}", bind.0, bind.1))?
    .run()
    .await
    .context("HTTP server failed")?;

    tracing::info!("👋 Order service stopped");
    Ok(())
}

/// Open the connection pool, retrying while the database is still coming up.
async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    tracing::info!(max_connections = config.database_max_connections, "Connecting to PostgreSQL...");

    let retry = RetryConfig::with_attempts(config.db_connect_attempts);
    let pool = retry_on_transient(&retry, "connect to PostgreSQL", |_attempt| {
        PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
    })
    .await
    .context("Failed to connect to PostgreSQL")?;

    tracing::info!("✅ Connected to PostgreSQL");
    Ok(pool)
}
