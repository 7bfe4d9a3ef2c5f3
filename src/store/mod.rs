//! Shared persistent store for all durable security state.
//!
//! # Data Flow
//! ```text
//! Components (sessions, rate limiter, WAF, audit, alerts)
//!     → SecurityStore trait (atomic read/write/insert-if-absent)
//!     → memory.rs (in-process dashmap implementation)
//! ```
//!
//! # Design Decisions
//! - One trait per deployment concern, not per entity: swapping the
//!   backing store swaps it for every table at once
//! - Rate-hit appends for the same key serialize on the store side so
//!   concurrent increments never undercount
//! - Blocklist insertion is monotonic set union; concurrent writers are
//!   safe without coordination

pub mod memory;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::audit::anomaly::{AlertKind, SecurityAlert};
use crate::audit::log::AuditLogEntry;
use crate::error::StoreError;
use crate::security::blocklist::BlockEntry;
use crate::session::Session;

/// Atomic persistence operations used by every security component.
///
/// Implementations must provide at-least read-committed isolation and
/// atomic insert-if-absent semantics where noted.
pub trait SecurityStore: Send + Sync {
    // Sessions

    /// Insert a session iff no row exists for its token. Returns false
    /// when the token is already taken.
    fn insert_session(&self, session: Session) -> Result<bool, StoreError>;
    fn get_session(&self, token: &str) -> Result<Option<Session>, StoreError>;
    fn update_session(&self, session: &Session) -> Result<(), StoreError>;
    /// Idempotent delete.
    fn delete_session(&self, token: &str) -> Result<(), StoreError>;
    /// Delete all sessions for one identity; returns the removed count.
    fn delete_sessions_for(&self, identity_id: &str) -> Result<usize, StoreError>;
    /// Delete rows past their absolute expiry or idle deadline.
    fn delete_expired_sessions(
        &self,
        now: DateTime<Utc>,
        idle: Duration,
    ) -> Result<usize, StoreError>;

    // Rate limiting

    /// Append one hit event for a key. Appends for the same key must be
    /// serialized by the implementation.
    fn record_hit(&self, key: &str, at: DateTime<Utc>) -> Result<(), StoreError>;
    fn count_hits(&self, key: &str, since: DateTime<Utc>) -> Result<u32, StoreError>;
    /// Drop hit events older than `before` for one key.
    fn prune_hits(&self, key: &str, before: DateTime<Utc>) -> Result<(), StoreError>;
    /// Drop hit events older than `before` across all keys.
    fn prune_all_hits(&self, before: DateTime<Utc>) -> Result<usize, StoreError>;

    // Blocklist

    /// Monotonic set insert; re-blocking refreshes the timestamp.
    fn block_address(&self, address: &str, at: DateTime<Utc>) -> Result<(), StoreError>;
    fn blocked_since(&self, address: &str) -> Result<Option<DateTime<Utc>>, StoreError>;
    fn blocked_addresses(&self) -> Result<Vec<BlockEntry>, StoreError>;
    fn unblock_address(&self, address: &str) -> Result<bool, StoreError>;
    fn prune_blocklist(&self, before: DateTime<Utc>) -> Result<usize, StoreError>;

    // Audit log

    fn append_audit(&self, entry: AuditLogEntry) -> Result<(), StoreError>;
    /// Entries newer than `since`, oldest first.
    fn audit_since(&self, since: DateTime<Utc>) -> Result<Vec<AuditLogEntry>, StoreError>;
    fn prune_audit(&self, before: DateTime<Utc>) -> Result<usize, StoreError>;

    // Alerts

    fn has_open_alert(&self, kind: AlertKind, subject: &str) -> Result<bool, StoreError>;
    fn insert_alert(&self, alert: SecurityAlert) -> Result<(), StoreError>;
    fn list_alerts(&self, include_resolved: bool) -> Result<Vec<SecurityAlert>, StoreError>;
    /// Returns false for unknown or already-resolved alerts.
    fn resolve_alert(
        &self,
        id: Uuid,
        resolved_by: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}

#[cfg(test)]
pub mod testing {
    //! Store doubles for fail-open / fail-closed tests.

    use super::*;

    fn down<T>() -> Result<T, StoreError> {
        Err(StoreError::Unavailable("down".into()))
    }

    /// A store whose every operation fails with `Unavailable`.
    pub struct UnavailableStore;

    impl SecurityStore for UnavailableStore {
        fn insert_session(&self, _: Session) -> Result<bool, StoreError> {
            down()
        }
        fn get_session(&self, _: &str) -> Result<Option<Session>, StoreError> {
            down()
        }
        fn update_session(&self, _: &Session) -> Result<(), StoreError> {
            down()
        }
        fn delete_session(&self, _: &str) -> Result<(), StoreError> {
            down()
        }
        fn delete_sessions_for(&self, _: &str) -> Result<usize, StoreError> {
            down()
        }
        fn delete_expired_sessions(
            &self,
            _: DateTime<Utc>,
            _: Duration,
        ) -> Result<usize, StoreError> {
            down()
        }
        fn record_hit(&self, _: &str, _: DateTime<Utc>) -> Result<(), StoreError> {
            down()
        }
        fn count_hits(&self, _: &str, _: DateTime<Utc>) -> Result<u32, StoreError> {
            down()
        }
        fn prune_hits(&self, _: &str, _: DateTime<Utc>) -> Result<(), StoreError> {
            down()
        }
        fn prune_all_hits(&self, _: DateTime<Utc>) -> Result<usize, StoreError> {
            down()
        }
        fn block_address(&self, _: &str, _: DateTime<Utc>) -> Result<(), StoreError> {
            down()
        }
        fn blocked_since(&self, _: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
            down()
        }
        fn blocked_addresses(&self) -> Result<Vec<BlockEntry>, StoreError> {
            down()
        }
        fn unblock_address(&self, _: &str) -> Result<bool, StoreError> {
            down()
        }
        fn prune_blocklist(&self, _: DateTime<Utc>) -> Result<usize, StoreError> {
            down()
        }
        fn append_audit(&self, _: AuditLogEntry) -> Result<(), StoreError> {
            down()
        }
        fn audit_since(&self, _: DateTime<Utc>) -> Result<Vec<AuditLogEntry>, StoreError> {
            down()
        }
        fn prune_audit(&self, _: DateTime<Utc>) -> Result<usize, StoreError> {
            down()
        }
        fn has_open_alert(&self, _: AlertKind, _: &str) -> Result<bool, StoreError> {
            down()
        }
        fn insert_alert(&self, _: SecurityAlert) -> Result<(), StoreError> {
            down()
        }
        fn list_alerts(&self, _: bool) -> Result<Vec<SecurityAlert>, StoreError> {
            down()
        }
        fn resolve_alert(&self, _: Uuid, _: &str, _: DateTime<Utc>) -> Result<bool, StoreError> {
            down()
        }
    }
}
