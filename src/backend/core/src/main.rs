//! Tenancy server - main entry point
//!
//! Serves the side endpoints and validates the configured registries at
//! startup.

use std::net::SocketAddr;
use std::sync::Arc;

use conductor_tenancy::{
    access::{AccessGate, AccessPredicate, StaticDirectory},
    api::{self, AppState},
    config::Config,
    telemetry,
    transform::{Backend, Registry},
    workflow::TaskPolicy,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = match std::env::var("TENANCY_CONFIG") {
        Ok(path) => Config::from_file(&path)?,
        Err(_) => Config::load().unwrap_or_else(|e| {
            eprintln!("Warning: Could not load config: {}. Using defaults.", e);
            Config::default()
        }),
    };

    telemetry::init_logging(&config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting tenancy server"
    );

    let policy = Arc::new(TaskPolicy::from_config(&config.tasks));
    let full = Registry::full(policy.clone(), &config.access);
    let rbac = Registry::rbac(policy);

    tracing::info!(
        full = full.len(),
        rbac = rbac.len(),
        conductor = %config.backends.conductor,
        schellar = %config.backends.schellar,
        scheduling_in_rbac = rbac.supports(Backend::Scheduler),
        "Transformer registries ready"
    );

    let directory = Arc::new(StaticDirectory::from_config(&config.access.directory));
    tracing::info!(entries = directory.len(), "Static directory loaded");

    let state = AppState::new(
        AccessGate::with_directory(directory),
        AccessPredicate::admin(&config.access.owner_role, &config.access.admin_group),
    );
    let app = api::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!(address = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install signal handler");
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
