//! Admin surface: alerts, blocklist, scans, session revocation.
//!
//! Every route requires a session held by an `admin` role identity.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::pipeline::SecurityContext;

pub fn setup_admin_router(ctx: Arc<SecurityContext>) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/alerts", get(get_alerts))
        .route("/admin/alerts/{id}/resolve", post(resolve_alert))
        .route("/admin/blocklist", get(get_blocklist))
        .route("/admin/blocklist/{address}", delete(unblock_address))
        .route("/admin/scan", post(run_scan))
        .route("/admin/identities/{id}/sessions", delete(revoke_identity_sessions))
        .layer(middleware::from_fn_with_state(ctx.clone(), admin_auth_middleware))
        .with_state(ctx)
}
