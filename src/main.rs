//! Security core daemon.
//!
//! Boots the shared security context, wraps a demo application router
//! with the enforcement pipeline, and runs the admin surface alongside
//! background housekeeping and config hot reload.

use std::path::Path;
use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use perimeter::authz::{Identity, Role};
use perimeter::config::loader::load_config;
use perimeter::config::watcher::watch_config;
use perimeter::config::SecurityConfig;
use perimeter::lifecycle::{Housekeeping, Shutdown};
use perimeter::store::memory::{MemoryDirectory, MemoryStore};
use perimeter::{SecurityContext, SecurityServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "perimeter=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("perimeter v{} starting", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "security.toml".to_string());
    let config = if Path::new(&config_path).exists() {
        load_config(Path::new(&config_path))?
    } else {
        tracing::warn!(path = %config_path, "Config file not found, using defaults");
        SecurityConfig::default()
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        rate_limit_enabled = config.rate_limit.enabled,
        waf_rules = config.waf.rules.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            perimeter::observability::metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // In-process store and directory. An embedding application supplies
    // its own identity provider and ownership resolver instead.
    let store = Arc::new(MemoryStore::new());
    let directory = Arc::new(MemoryDirectory::new());
    let ctx = SecurityContext::new(config.clone(), store, directory.clone(), directory.clone());

    bootstrap_admin(&ctx, &directory);

    // Config hot reload: the watcher handle must stay alive.
    let _watcher = if Path::new(&config_path).exists() {
        let (watcher, mut reload_rx) = watch_config(Path::new(&config_path))?;
        let reload_ctx = ctx.clone();
        tokio::spawn(async move {
            while let Some(new_config) = reload_rx.recv().await {
                reload_ctx.apply_config(new_config);
            }
        });
        Some(watcher)
    } else {
        None
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(Housekeeping::new(ctx.clone()).run(shutdown.subscribe()));

    tokio::spawn(shutdown.trigger_on_ctrl_c());

    let app = Router::new().route("/", get(|| async { "perimeter" }));
    let server = SecurityServer::new(ctx, app);
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn bootstrap_admin(ctx: &SecurityContext, directory: &MemoryDirectory) {
    directory.add_identity(Identity {
        id: "admin".to_string(),
        email: "admin@localhost".to_string(),
        role: Role::Admin,
        active: true,
    });
    let config = ctx.config.load();
    match ctx.sessions.create("admin", "127.0.0.1", "bootstrap", &config.session) {
        Ok(token) => {
            // Stdout only. The token is a credential and must not enter
            // the log stream.
            println!("bootstrap admin token: {token}");
            tracing::info!("Bootstrap admin session created");
        }
        Err(e) => tracing::error!(error = %e, "Failed to create bootstrap admin session"),
    }
}
