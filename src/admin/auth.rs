//! Admin surface authentication.
//!
//! Admin endpoints require a valid session held by an `admin` role
//! identity. Failed attempts audit as `ADMIN_LOGIN_FAILED` so the
//! anomaly detector sees probes against the admin surface.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::audit::log::{Actor, AuditAction};
use crate::authz::Role;
use crate::error::SecurityError;
use crate::http::middleware::bearer_token;
use crate::pipeline::SecurityContext;

pub async fn admin_auth_middleware(
    State(ctx): State<Arc<SecurityContext>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, SecurityError> {
    let config = ctx.config.load_full();

    let Some(token) = bearer_token(request.headers()) else {
        audit_failed_attempt(&ctx, addr, "missing token");
        return Err(SecurityError::Unauthenticated);
    };

    let identity = match ctx.authorizer.require_role(token, Role::Admin, &config.session) {
        Ok(identity) => identity,
        Err(SecurityError::Unauthenticated) => {
            audit_failed_attempt(&ctx, addr, "invalid session");
            return Err(SecurityError::Unauthenticated);
        }
        // Forbidden already audited by the authorizer.
        Err(e) => return Err(e),
    };

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

fn audit_failed_attempt(ctx: &SecurityContext, addr: SocketAddr, reason: &str) {
    ctx.audit.record(
        &Actor::anonymous(addr.ip().to_string(), ""),
        AuditAction::AdminLoginFailed,
        None,
        serde_json::json!({ "reason": reason }),
    );
}
