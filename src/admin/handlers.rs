//! Admin surface handlers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::anomaly::SecurityAlert;
use crate::audit::log::{Actor, AuditAction};
use crate::authz::Identity;
use crate::error::SecurityError;
use crate::pipeline::SecurityContext;
use crate::security::BlockEntry;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub open_alerts: usize,
    pub blocked_addresses: usize,
}

pub async fn get_status(
    State(ctx): State<Arc<SecurityContext>>,
) -> Result<Json<SystemStatus>, SecurityError> {
    Ok(Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        open_alerts: ctx.detector.list_alerts(false)?.len(),
        blocked_addresses: ctx.filter.blocklist().entries()?.len(),
    }))
}

#[derive(Deserialize)]
pub struct AlertsQuery {
    #[serde(default)]
    pub include_resolved: bool,
}

pub async fn get_alerts(
    State(ctx): State<Arc<SecurityContext>>,
    Query(query): Query<AlertsQuery>,
) -> Result<Json<Vec<SecurityAlert>>, SecurityError> {
    Ok(Json(ctx.detector.list_alerts(query.include_resolved)?))
}

pub async fn resolve_alert(
    State(ctx): State<Arc<SecurityContext>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Extension(admin): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, SecurityError> {
    if !ctx.detector.resolve(id, &admin.id)? {
        return Ok(StatusCode::NOT_FOUND);
    }

    ctx.audit.record(
        &admin_actor(&admin, addr),
        AuditAction::AlertResolved,
        Some(("alert", &id.to_string())),
        serde_json::json!({}),
    );
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_blocklist(
    State(ctx): State<Arc<SecurityContext>>,
) -> Result<Json<Vec<BlockEntry>>, SecurityError> {
    Ok(Json(ctx.filter.blocklist().entries()?))
}

pub async fn unblock_address(
    State(ctx): State<Arc<SecurityContext>>,
    Path(address): Path<String>,
) -> Result<StatusCode, SecurityError> {
    if ctx.filter.blocklist().unblock(&address)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

#[derive(Serialize)]
pub struct ScanResult {
    pub alerts_raised: usize,
}

pub async fn run_scan(
    State(ctx): State<Arc<SecurityContext>>,
) -> Json<ScanResult> {
    let config = ctx.config.load();
    Json(ScanResult {
        alerts_raised: ctx.detector.scan(&config.anomaly),
    })
}

#[derive(Serialize)]
pub struct RevokeResult {
    pub sessions_revoked: usize,
}

pub async fn revoke_identity_sessions(
    State(ctx): State<Arc<SecurityContext>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Extension(admin): Extension<Identity>,
    Path(identity_id): Path<String>,
) -> Result<Json<RevokeResult>, SecurityError> {
    let revoked = ctx.sessions.revoke_all(&identity_id)?;

    ctx.audit.record(
        &admin_actor(&admin, addr),
        AuditAction::SessionRevoked,
        Some(("identity", &identity_id)),
        serde_json::json!({ "sessions_revoked": revoked }),
    );
    Ok(Json(RevokeResult {
        sessions_revoked: revoked,
    }))
}

fn admin_actor(admin: &Identity, addr: SocketAddr) -> Actor {
    Actor {
        identity_id: Some(admin.id.clone()),
        role: Some(admin.role),
        client_address: addr.ip().to_string(),
        client_signature: String::new(),
    }
}
