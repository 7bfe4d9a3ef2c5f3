//! Append-only structured audit log.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::authz::Role;
use crate::store::SecurityStore;

/// Severity attached to audit entries, alerts, and WAF rules.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Auditable actions recorded by the security core and the business layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Login,
    Logout,
    LoginFailed,
    AdminLoginFailed,
    UnauthorizedAccess,
    PrivilegeEscalation,
    RateLimitExceeded,
    RequestBlocked,
    RequestRedirected,
    RuleMatched,
    SessionRevoked,
    AlertResolved,
}

impl AuditAction {
    /// Static action → severity table.
    pub fn severity(self) -> Severity {
        match self {
            AuditAction::UnauthorizedAccess
            | AuditAction::PrivilegeEscalation
            | AuditAction::AdminLoginFailed => Severity::High,
            AuditAction::LoginFailed | AuditAction::RateLimitExceeded => Severity::Medium,
            _ => Severity::Low,
        }
    }

    /// True for the `*_FAILED` family counted by the brute-force scan.
    pub fn is_failure(self) -> bool {
        matches!(self, AuditAction::LoginFailed | AuditAction::AdminLoginFailed)
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
            AuditAction::LoginFailed => "LOGIN_FAILED",
            AuditAction::AdminLoginFailed => "ADMIN_LOGIN_FAILED",
            AuditAction::UnauthorizedAccess => "UNAUTHORIZED_ACCESS",
            AuditAction::PrivilegeEscalation => "PRIVILEGE_ESCALATION",
            AuditAction::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            AuditAction::RequestBlocked => "REQUEST_BLOCKED",
            AuditAction::RequestRedirected => "REQUEST_REDIRECTED",
            AuditAction::RuleMatched => "RULE_MATCHED",
            AuditAction::SessionRevoked => "SESSION_REVOKED",
            AuditAction::AlertResolved => "ALERT_RESOLVED",
        };
        write!(f, "{}", name)
    }
}

/// One persisted audit row. Never mutated after append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub actor_identity_id: Option<String>,
    pub actor_role: Option<Role>,
    pub action: AuditAction,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub client_address: String,
    pub client_signature: String,
    pub detail: serde_json::Value,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

/// Context describing who performed an audited action.
#[derive(Debug, Clone, Default)]
pub struct Actor {
    pub identity_id: Option<String>,
    pub role: Option<Role>,
    pub client_address: String,
    pub client_signature: String,
}

impl Actor {
    /// Anonymous actor known only by network attributes.
    pub fn anonymous(client_address: impl Into<String>, client_signature: impl Into<String>) -> Self {
        Self {
            identity_id: None,
            role: None,
            client_address: client_address.into(),
            client_signature: client_signature.into(),
        }
    }
}

/// Append-only audit writer. Shared across all components via `Arc`.
#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn SecurityStore>,
}

impl AuditLog {
    pub fn new(store: Arc<dyn SecurityStore>) -> Self {
        Self { store }
    }

    /// Append one entry with severity from the static action table. A
    /// store failure must not abort the caller's primary operation: it
    /// is captured and sent to the fallback channel (local tracing).
    pub fn record(
        &self,
        actor: &Actor,
        action: AuditAction,
        resource: Option<(&str, &str)>,
        detail: serde_json::Value,
    ) {
        self.record_entry(actor, action, resource, detail, action.severity(), Utc::now());
    }

    /// Append with an explicit severity. Used by the WAF, where a rule's
    /// own severity outranks the action table.
    pub fn record_with_severity(
        &self,
        actor: &Actor,
        action: AuditAction,
        resource: Option<(&str, &str)>,
        detail: serde_json::Value,
        severity: Severity,
    ) {
        self.record_entry(actor, action, resource, detail, severity, Utc::now());
    }

    pub fn record_at(
        &self,
        actor: &Actor,
        action: AuditAction,
        resource: Option<(&str, &str)>,
        detail: serde_json::Value,
        now: DateTime<Utc>,
    ) {
        self.record_entry(actor, action, resource, detail, action.severity(), now);
    }

    fn record_entry(
        &self,
        actor: &Actor,
        action: AuditAction,
        resource: Option<(&str, &str)>,
        detail: serde_json::Value,
        severity: Severity,
        now: DateTime<Utc>,
    ) {
        let entry = AuditLogEntry {
            actor_identity_id: actor.identity_id.clone(),
            actor_role: actor.role,
            action,
            resource_type: resource.map(|(t, _)| t.to_string()),
            resource_id: resource.map(|(_, i)| i.to_string()),
            client_address: actor.client_address.clone(),
            client_signature: actor.client_signature.clone(),
            detail,
            severity,
            created_at: now,
        };

        if let Err(e) = self.store.append_audit(entry) {
            // Fallback channel: the decision already happened, the trail
            // write must not mask it.
            tracing::error!(
                action = %action,
                client = %actor.client_address,
                error = %e,
                "Audit write failed, entry dropped to fallback log"
            );
        }
    }

    /// Entries newer than `since`, oldest first.
    pub fn entries_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<AuditLogEntry>, crate::error::StoreError> {
        self.store.audit_since(since)
    }

    /// Retention pruning. Returns the number of removed rows.
    pub fn prune_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, crate::error::StoreError> {
        self.store.prune_audit(cutoff)
    }
}
