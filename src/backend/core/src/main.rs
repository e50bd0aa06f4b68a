//! Strive Server - Main entry point
//!
//! Serves the transaction-loop API over PostgreSQL with tenant isolation and
//! role/tier access control.

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

use strive_core::{
    api::{self, AppState},
    audit::{AuditTrail, PgAuditSink},
    config::Config,
    rbac::AccessPolicy,
    telemetry,
    tenant::QueryGuard,
    transactions::{PgLoopStore, TransactionService},
};

/// Optional path to a configuration file; environment overrides apply on top.
const CONFIG_FILE_VAR: &str = "STRIVE_CONFIG_FILE";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = match std::env::var(CONFIG_FILE_VAR) {
        Ok(path) => Config::from_file(&path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        Err(_) => Config::load().context("Failed to load configuration")?,
    };

    telemetry::init_logging(&config.logging)?;
    let metrics = telemetry::install_prometheus()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        unknown_route_policy = ?config.access.unknown_route_policy,
        audit_policy = ?config.access.audit_policy,
        "Starting Strive Server"
    );

    let database_url = config
        .database
        .url
        .clone()
        .context("database.url is required (set STRIVE__DATABASE__URL)")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let policy = AccessPolicy::standard().with_unknown_route_policy(config.access.unknown_route_policy);
    let audit = AuditTrail::new(Arc::new(PgAuditSink::new(pool.clone())), config.access.audit_policy);
    let transactions = TransactionService::new(
        Arc::new(PgLoopStore::new(pool.clone())),
        QueryGuard::new(policy.clone()),
        audit,
    )
    .with_min_tier(config.access.transactions_min_tier);

    let app = api::build_router(AppState::new(transactions, policy).with_metrics(metrics));

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(address = %addr, "Starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    tracing::info!("Shutdown signal received");
}
