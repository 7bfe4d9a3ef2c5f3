//! Threshold-based anomaly detection over the audit trail.
//!
//! # Responsibilities
//! - Scan a trailing window of audit entries
//! - Raise at most one open alert per (kind, subject) pair
//! - Degrade to "no new alerts" when the store is unavailable
//!
//! # Detected Conditions
//! - `BRUTE_FORCE_SUSPECTED`: repeated `*_FAILED` entries per address
//! - `PRIVILEGE_ESCALATION`: repeated elevated-role denials per identity
//! - `MULTI_IP_USAGE`: one identity fanning out over many addresses

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::audit::log::{AuditAction, Severity};
use crate::authz::Role;
use crate::config::AnomalyConfig;
use crate::observability::metrics;
use crate::store::SecurityStore;

/// Alert categories produced by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    BruteForceSuspected,
    PrivilegeEscalation,
    MultiIpUsage,
}

impl AlertKind {
    pub fn severity(self) -> Severity {
        match self {
            AlertKind::BruteForceSuspected => Severity::High,
            AlertKind::PrivilegeEscalation => Severity::Critical,
            AlertKind::MultiIpUsage => Severity::Medium,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::BruteForceSuspected => write!(f, "BRUTE_FORCE_SUSPECTED"),
            AlertKind::PrivilegeEscalation => write!(f, "PRIVILEGE_ESCALATION"),
            AlertKind::MultiIpUsage => write!(f, "MULTI_IP_USAGE"),
        }
    }
}

/// A raised alert. Mutated only to flip `resolved`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityAlert {
    pub id: Uuid,
    pub kind: AlertKind,
    pub severity: Severity,
    /// Dedup key: client address or identity id, depending on kind.
    pub subject: String,
    pub actor_identity_id: Option<String>,
    pub client_address: Option<String>,
    pub detail: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub resolved: bool,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Query-time analyzer over accumulated audit rows.
#[derive(Clone)]
pub struct AnomalyDetector {
    store: Arc<dyn SecurityStore>,
}

impl AnomalyDetector {
    pub fn new(store: Arc<dyn SecurityStore>) -> Self {
        Self { store }
    }

    /// Run one scan over the trailing window. Returns the number of
    /// newly raised alerts. Store errors degrade to zero new alerts.
    pub fn scan(&self, config: &AnomalyConfig) -> usize {
        self.scan_at(config, Utc::now())
    }

    pub fn scan_at(&self, config: &AnomalyConfig, now: DateTime<Utc>) -> usize {
        let since = now - Duration::seconds(config.window_secs as i64);
        let entries = match self.store.audit_since(since) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "Anomaly scan skipped, audit store unavailable");
                return 0;
            }
        };

        let mut failures_by_address: HashMap<&str, u32> = HashMap::new();
        let mut escalations_by_identity: HashMap<&str, u32> = HashMap::new();
        let mut addresses_by_identity: HashMap<&str, HashSet<&str>> = HashMap::new();

        for entry in &entries {
            if entry.action.is_failure() {
                *failures_by_address.entry(entry.client_address.as_str()).or_default() += 1;
            }

            if entry.action == AuditAction::UnauthorizedAccess {
                let required = entry
                    .detail
                    .get("required_role")
                    .and_then(|v| v.as_str())
                    .map(Role::from_name_or_default);
                if required.is_some_and(|r| r.is_elevated()) {
                    if let Some(id) = entry.actor_identity_id.as_deref() {
                        *escalations_by_identity.entry(id).or_default() += 1;
                    }
                }
            }

            if let Some(id) = entry.actor_identity_id.as_deref() {
                addresses_by_identity
                    .entry(id)
                    .or_default()
                    .insert(entry.client_address.as_str());
            }
        }

        let mut raised = 0;

        for (address, count) in failures_by_address {
            if count >= config.failure_threshold {
                raised += self.raise(
                    AlertKind::BruteForceSuspected,
                    address,
                    None,
                    Some(address),
                    serde_json::json!({ "failures": count }),
                    now,
                );
            }
        }

        for (identity, count) in escalations_by_identity {
            if count >= config.escalation_threshold {
                raised += self.raise(
                    AlertKind::PrivilegeEscalation,
                    identity,
                    Some(identity),
                    None,
                    serde_json::json!({ "denied_attempts": count }),
                    now,
                );
            }
        }

        for (identity, addresses) in addresses_by_identity {
            if addresses.len() as u32 >= config.fanout_threshold {
                raised += self.raise(
                    AlertKind::MultiIpUsage,
                    identity,
                    Some(identity),
                    None,
                    serde_json::json!({ "distinct_addresses": addresses.len() }),
                    now,
                );
            }
        }

        if raised > 0 {
            tracing::info!(raised, window_secs = config.window_secs, "Anomaly scan raised alerts");
        }
        raised
    }

    /// Insert one alert unless an open one already exists for the same
    /// (kind, subject). Returns 1 if inserted, 0 otherwise.
    fn raise(
        &self,
        kind: AlertKind,
        subject: &str,
        identity: Option<&str>,
        address: Option<&str>,
        detail: serde_json::Value,
        now: DateTime<Utc>,
    ) -> usize {
        match self.store.has_open_alert(kind, subject) {
            Ok(true) => return 0,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(error = %e, alert = %kind, "Alert dedup check failed, skipping");
                return 0;
            }
        }

        let alert = SecurityAlert {
            id: Uuid::new_v4(),
            kind,
            severity: kind.severity(),
            subject: subject.to_string(),
            actor_identity_id: identity.map(str::to_string),
            client_address: address.map(str::to_string),
            detail,
            created_at: now,
            resolved: false,
            resolved_by: None,
            resolved_at: None,
        };

        match self.store.insert_alert(alert) {
            Ok(()) => {
                tracing::warn!(alert = %kind, subject, "Security alert raised");
                metrics::record_alert_raised(kind);
                1
            }
            Err(e) => {
                tracing::warn!(error = %e, alert = %kind, "Alert insert failed");
                0
            }
        }
    }

    pub fn list_alerts(
        &self,
        include_resolved: bool,
    ) -> Result<Vec<SecurityAlert>, crate::error::StoreError> {
        self.store.list_alerts(include_resolved)
    }

    /// Flip `resolved` on an open alert. Returns false if unknown or
    /// already resolved.
    pub fn resolve(
        &self,
        id: Uuid,
        resolved_by: &str,
    ) -> Result<bool, crate::error::StoreError> {
        self.store.resolve_alert(id, resolved_by, Utc::now())
    }
}
