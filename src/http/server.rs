//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap the protected application router with the security guard
//! - Mount the admin surface and health probe
//! - Wire up middleware (tracing, timeouts)
//! - Bind server to listener with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin;
use crate::http::middleware::security_guard;
use crate::pipeline::SecurityContext;

/// HTTP server enforcing the security pipeline in front of an
/// application router.
pub struct SecurityServer {
    router: Router,
}

impl SecurityServer {
    /// Build the server. Application routes and the admin surface both
    /// sit behind the guard, so blocklisted or rate-limited sources are
    /// denied before admin auth runs; the health probe is open.
    pub fn new(ctx: Arc<SecurityContext>, app: Router) -> Self {
        let request_timeout = ctx.config.load().listener.request_timeout_secs;

        let router = app
            .merge(admin::setup_admin_router(ctx.clone()))
            .layer(middleware::from_fn_with_state(ctx, security_guard))
            .route("/health", get(|| async { "ok" }))
            .layer(TimeoutLayer::new(Duration::from_secs(request_timeout)))
            .layer(TraceLayer::new_for_http());

        Self { router }
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
