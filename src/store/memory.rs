//! In-process store implementation over concurrent maps.
//!
//! Sessions, hits, and the blocklist live in `DashMap`s keyed for
//! point lookups. The audit trail and alert list are append-mostly and
//! sit behind plain mutexes.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::audit::anomaly::{AlertKind, SecurityAlert};
use crate::audit::log::AuditLogEntry;
use crate::authz::{Identity, IdentityProvider, OwnershipResolver};
use crate::error::StoreError;
use crate::security::blocklist::BlockEntry;
use crate::session::Session;
use crate::store::SecurityStore;

/// Non-persistent `SecurityStore` suitable for a single process.
#[derive(Default)]
pub struct MemoryStore {
    sessions: DashMap<String, Session>,
    hits: DashMap<String, Vec<DateTime<Utc>>>,
    blocklist: DashMap<String, DateTime<Utc>>,
    audit: Mutex<Vec<AuditLogEntry>>,
    alerts: Mutex<Vec<SecurityAlert>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecurityStore for MemoryStore {
    fn insert_session(&self, session: Session) -> Result<bool, StoreError> {
        match self.sessions.entry(session.token.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(session);
                Ok(true)
            }
        }
    }

    fn get_session(&self, token: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.get(token).map(|s| s.clone()))
    }

    fn update_session(&self, session: &Session) -> Result<(), StoreError> {
        self.sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    fn delete_session(&self, token: &str) -> Result<(), StoreError> {
        self.sessions.remove(token);
        Ok(())
    }

    fn delete_sessions_for(&self, identity_id: &str) -> Result<usize, StoreError> {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.identity_id != identity_id);
        Ok(before - self.sessions.len())
    }

    fn delete_expired_sessions(
        &self,
        now: DateTime<Utc>,
        idle: Duration,
    ) -> Result<usize, StoreError> {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, s| now <= s.expires_at && now <= s.last_seen_at + idle);
        Ok(before - self.sessions.len())
    }

    fn record_hit(&self, key: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        // The entry lock serializes concurrent appends for one key.
        self.hits.entry(key.to_string()).or_default().push(at);
        Ok(())
    }

    fn count_hits(&self, key: &str, since: DateTime<Utc>) -> Result<u32, StoreError> {
        Ok(self
            .hits
            .get(key)
            .map(|events| events.iter().filter(|at| **at >= since).count() as u32)
            .unwrap_or(0))
    }

    fn prune_hits(&self, key: &str, before: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(mut events) = self.hits.get_mut(key) {
            events.retain(|at| *at >= before);
        }
        Ok(())
    }

    fn prune_all_hits(&self, before: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut removed = 0;
        for mut events in self.hits.iter_mut() {
            let len = events.len();
            events.retain(|at| *at >= before);
            removed += len - events.len();
        }
        self.hits.retain(|_, events| !events.is_empty());
        Ok(removed)
    }

    fn block_address(&self, address: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.blocklist.insert(address.to_string(), at);
        Ok(())
    }

    fn blocked_since(&self, address: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.blocklist.get(address).map(|at| *at))
    }

    fn blocked_addresses(&self) -> Result<Vec<BlockEntry>, StoreError> {
        Ok(self
            .blocklist
            .iter()
            .map(|entry| BlockEntry {
                address: entry.key().clone(),
                blocked_at: *entry.value(),
            })
            .collect())
    }

    fn unblock_address(&self, address: &str) -> Result<bool, StoreError> {
        Ok(self.blocklist.remove(address).is_some())
    }

    fn prune_blocklist(&self, before: DateTime<Utc>) -> Result<usize, StoreError> {
        let count = self.blocklist.len();
        self.blocklist.retain(|_, at| *at >= before);
        Ok(count - self.blocklist.len())
    }

    fn append_audit(&self, entry: AuditLogEntry) -> Result<(), StoreError> {
        self.audit.lock().expect("audit mutex poisoned").push(entry);
        Ok(())
    }

    fn audit_since(&self, since: DateTime<Utc>) -> Result<Vec<AuditLogEntry>, StoreError> {
        let audit = self.audit.lock().expect("audit mutex poisoned");
        Ok(audit.iter().filter(|e| e.created_at >= since).cloned().collect())
    }

    fn prune_audit(&self, before: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut audit = self.audit.lock().expect("audit mutex poisoned");
        let len = audit.len();
        audit.retain(|e| e.created_at >= before);
        Ok(len - audit.len())
    }

    fn has_open_alert(&self, kind: AlertKind, subject: &str) -> Result<bool, StoreError> {
        let alerts = self.alerts.lock().expect("alerts mutex poisoned");
        Ok(alerts
            .iter()
            .any(|a| !a.resolved && a.kind == kind && a.subject == subject))
    }

    fn insert_alert(&self, alert: SecurityAlert) -> Result<(), StoreError> {
        self.alerts.lock().expect("alerts mutex poisoned").push(alert);
        Ok(())
    }

    fn list_alerts(&self, include_resolved: bool) -> Result<Vec<SecurityAlert>, StoreError> {
        let alerts = self.alerts.lock().expect("alerts mutex poisoned");
        Ok(alerts
            .iter()
            .filter(|a| include_resolved || !a.resolved)
            .cloned()
            .collect())
    }

    fn resolve_alert(
        &self,
        id: Uuid,
        resolved_by: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut alerts = self.alerts.lock().expect("alerts mutex poisoned");
        match alerts.iter_mut().find(|a| a.id == id && !a.resolved) {
            Some(alert) => {
                alert.resolved = true;
                alert.resolved_by = Some(resolved_by.to_string());
                alert.resolved_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// In-process identity and ownership directory. Stands in for the
/// business layer's user store in examples and tests.
#[derive(Default)]
pub struct MemoryDirectory {
    identities: DashMap<String, Identity>,
    owners: DashMap<(String, String), String>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_identity(&self, identity: Identity) {
        self.identities.insert(identity.id.clone(), identity);
    }

    pub fn set_active(&self, identity_id: &str, active: bool) {
        if let Some(mut identity) = self.identities.get_mut(identity_id) {
            identity.active = active;
        }
    }

    pub fn set_owner(&self, resource_type: &str, resource_id: &str, identity_id: &str) {
        self.owners.insert(
            (resource_type.to_string(), resource_id.to_string()),
            identity_id.to_string(),
        );
    }
}

impl IdentityProvider for MemoryDirectory {
    fn fetch(&self, identity_id: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self.identities.get(identity_id).map(|i| i.clone()))
    }
}

impl OwnershipResolver for MemoryDirectory {
    fn is_owner(
        &self,
        identity_id: &str,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<bool, StoreError> {
        Ok(self
            .owners
            .get(&(resource_type.to_string(), resource_id.to_string()))
            .map(|owner| owner.as_str() == identity_id)
            .unwrap_or(false))
    }
}
