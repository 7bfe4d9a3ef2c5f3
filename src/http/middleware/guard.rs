//! Request guard middleware.
//!
//! Buffers each incoming request into a transport-neutral view, runs
//! the security pipeline, and either rejects the request or forwards
//! it with the caller's validated identity attached as an extension.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::error::SecurityError;
use crate::pipeline::{DenyReason, InspectableRequest, PipelineOutcome, SecurityContext};

/// Bodies beyond this size are refused with 413 before any rule runs;
/// rules never match against a truncated buffer.
const MAX_INSPECTED_BODY: usize = 1024 * 1024;

/// Extract the Bearer token from an Authorization header, if any.
pub fn bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Security pipeline middleware. Applied in front of every protected
/// route.
pub async fn security_guard(
    State(ctx): State<Arc<SecurityContext>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    // Full load: the handle lives across the body read below.
    let config = ctx.config.load_full();
    let (parts, body) = request.into_parts();

    let body_bytes = match axum::body::to_bytes(body, MAX_INSPECTED_BODY).await {
        Ok(bytes) => bytes,
        Err(_) => {
            // Too large to buffer, or the connection died mid-read.
            // Neither is a policy violation, so the source is not
            // penalized.
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    let inspectable = InspectableRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        endpoint: None,
        query: parts.uri.query().map(str::to_string),
        headers: parts
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect(),
        body: String::from_utf8_lossy(&body_bytes).into_owned(),
        client_address: client_address(&parts.headers, addr, &config.listener.trusted_proxies),
        client_signature: client_signature(&parts.headers),
    };

    match ctx.run_security_pipeline(&inspectable) {
        PipelineOutcome::Pass => {}
        PipelineOutcome::Blocked(DenyReason::RateLimited) => {
            return SecurityError::RateLimited.into_response();
        }
        PipelineOutcome::Blocked(reason) => {
            return SecurityError::Blocked {
                reason: match reason {
                    DenyReason::RuleMatched { rule_id } => format!("rule {}", rule_id),
                    _ => "blocked address".to_string(),
                },
            }
            .into_response();
        }
        PipelineOutcome::Redirected { location } => {
            return Redirect::temporary(&location).into_response();
        }
    }

    let mut request = Request::from_parts(parts, Body::from(body_bytes));

    // Best-effort identity attachment; handlers that need auth still go
    // through the authorizer themselves.
    if let Some(token) = bearer_token(request.headers()) {
        if let Ok(identity) = ctx.sessions.validate(token, &config.session) {
            request.extensions_mut().insert(identity);
        }
    }

    next.run(request).await
}

/// Client address: the socket peer, unless the peer is a configured
/// trusted proxy carrying X-Forwarded-For. Forwarding headers from any
/// other peer are ignored, so a direct client cannot pick its own
/// address.
fn client_address(
    headers: &axum::http::HeaderMap,
    addr: SocketAddr,
    trusted_proxies: &[String],
) -> String {
    let peer = addr.ip().to_string();
    if !trusted_proxies.iter().any(|proxy| *proxy == peer) {
        return peer;
    }

    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .map(str::to_string)
        .unwrap_or(peer)
}

/// Client fingerprint fed into rate limit keys and audit rows.
fn client_signature(headers: &axum::http::HeaderMap) -> String {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}
