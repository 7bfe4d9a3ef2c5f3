//! Opaque-token session persistence with sliding expiration.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::authz::{Identity, IdentityProvider};
use crate::config::SessionConfig;
use crate::error::{SecurityError, StoreError};
use crate::session::token;
use crate::store::SecurityStore;

/// One persisted session row. Exactly one row exists per token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub identity_id: String,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub client_address: String,
    pub client_signature: String,
}

/// Token-based identity persistence.
///
/// Validation fails closed: any store fault reads as `Unauthenticated`
/// to preserve confidentiality.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn SecurityStore>,
    identities: Arc<dyn IdentityProvider>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn SecurityStore>, identities: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identities }
    }

    /// Persist a new session after external credential verification and
    /// return its opaque token.
    pub fn create(
        &self,
        identity_id: &str,
        client_address: &str,
        client_signature: &str,
        config: &SessionConfig,
    ) -> Result<String, StoreError> {
        self.create_at(identity_id, client_address, client_signature, config, Utc::now())
    }

    pub fn create_at(
        &self,
        identity_id: &str,
        client_address: &str,
        client_signature: &str,
        config: &SessionConfig,
        now: DateTime<Utc>,
    ) -> Result<String, StoreError> {
        // Insert-if-absent guards token uniqueness; with 256-bit tokens a
        // collision retry is effectively unreachable.
        loop {
            let tok = token::generate();
            let session = Session {
                token: tok.clone(),
                identity_id: identity_id.to_string(),
                created_at: now,
                last_seen_at: now,
                expires_at: now + Duration::seconds(config.ttl_secs as i64),
                client_address: client_address.to_string(),
                client_signature: client_signature.to_string(),
            };
            if self.store.insert_session(session)? {
                tracing::debug!(identity_id, "Session created");
                return Ok(tok);
            }
        }
    }

    /// Validate a token, returning the referenced identity and extending
    /// the session (sliding renewal).
    pub fn validate(
        &self,
        token: &str,
        config: &SessionConfig,
    ) -> Result<Identity, SecurityError> {
        self.validate_at(token, config, Utc::now()).map(|(identity, _)| identity)
    }

    /// Like `validate`, but also returns the session row so callers can
    /// attribute audit entries to the session's network context.
    pub fn validate_full(
        &self,
        token: &str,
        config: &SessionConfig,
    ) -> Result<(Identity, Session), SecurityError> {
        self.validate_at(token, config, Utc::now())
    }

    pub fn validate_at(
        &self,
        token: &str,
        config: &SessionConfig,
        now: DateTime<Utc>,
    ) -> Result<(Identity, Session), SecurityError> {
        let session = match self.store.get_session(token) {
            Ok(Some(session)) => session,
            Ok(None) => return Err(SecurityError::Unauthenticated),
            Err(e) => {
                tracing::warn!(error = %e, "Session lookup failed, failing closed");
                return Err(SecurityError::Unauthenticated);
            }
        };

        if now > session.expires_at
            || now > session.last_seen_at + Duration::seconds(config.idle_secs as i64)
        {
            // Lazy expiry; the periodic sweep removes whatever this misses.
            let _ = self.store.delete_session(token);
            return Err(SecurityError::Unauthenticated);
        }

        let identity = match self.identities.fetch(&session.identity_id) {
            Ok(Some(identity)) if identity.active => identity,
            Ok(_) => return Err(SecurityError::Unauthenticated),
            Err(e) => {
                tracing::warn!(error = %e, "Identity lookup failed, failing closed");
                return Err(SecurityError::Unauthenticated);
            }
        };

        let mut renewed = session;
        renewed.last_seen_at = now;
        renewed.expires_at = now + Duration::seconds(config.ttl_secs as i64);
        if let Err(e) = self.store.update_session(&renewed) {
            tracing::warn!(error = %e, "Session renewal failed, failing closed");
            return Err(SecurityError::Unauthenticated);
        }

        Ok((identity, renewed))
    }

    /// Delete one session. Idempotent.
    pub fn revoke(&self, token: &str) -> Result<(), StoreError> {
        self.store.delete_session(token)
    }

    /// Delete every session belonging to an identity. Idempotent.
    /// Returns the number of removed rows.
    pub fn revoke_all(&self, identity_id: &str) -> Result<usize, StoreError> {
        self.store.delete_sessions_for(identity_id)
    }

    /// Remove all rows past their absolute or idle expiry. Safe to run
    /// concurrently and repeatedly.
    pub fn sweep_expired(&self, config: &SessionConfig) -> Result<usize, StoreError> {
        self.sweep_expired_at(config, Utc::now())
    }

    pub fn sweep_expired_at(
        &self,
        config: &SessionConfig,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        self.store
            .delete_expired_sessions(now, Duration::seconds(config.idle_secs as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::Role;
    use crate::store::memory::{MemoryDirectory, MemoryStore};
    use crate::store::testing::UnavailableStore;

    fn setup() -> (SessionStore, Arc<MemoryDirectory>, SessionConfig) {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(MemoryDirectory::new());
        directory.add_identity(Identity {
            id: "user-1".into(),
            email: "user@example.com".into(),
            role: Role::User,
            active: true,
        });
        let sessions = SessionStore::new(store, directory.clone());
        (sessions, directory, SessionConfig::default())
    }

    #[test]
    fn test_create_then_validate_round_trip() {
        let (sessions, _, config) = setup();
        let token = sessions.create("user-1", "10.0.0.1", "sig", &config).unwrap();

        let identity = sessions.validate(&token, &config).unwrap();
        assert_eq!(identity.id, "user-1");
        assert_eq!(identity.role, Role::User);
    }

    #[test]
    fn test_last_seen_strictly_increases() {
        let (sessions, _, config) = setup();
        let t0 = Utc::now();
        let token = sessions.create_at("user-1", "10.0.0.1", "sig", &config, t0).unwrap();

        let (_, s1) = sessions.validate_at(&token, &config, t0 + Duration::seconds(1)).unwrap();
        let (_, s2) = sessions.validate_at(&token, &config, t0 + Duration::seconds(2)).unwrap();
        assert!(s2.last_seen_at > s1.last_seen_at);
        assert!(s2.expires_at > s1.expires_at);
    }

    #[test]
    fn test_absolute_expiry() {
        let (sessions, _, config) = setup();
        let t0 = Utc::now();
        let token = sessions.create_at("user-1", "10.0.0.1", "sig", &config, t0).unwrap();

        let past_ttl = t0 + Duration::seconds(config.ttl_secs as i64 + 1);
        assert!(matches!(
            sessions.validate_at(&token, &config, past_ttl),
            Err(SecurityError::Unauthenticated)
        ));
    }

    #[test]
    fn test_idle_expiry() {
        let (sessions, _, config) = setup();
        let t0 = Utc::now();
        let token = sessions.create_at("user-1", "10.0.0.1", "sig", &config, t0).unwrap();

        let idle = t0 + Duration::seconds(config.idle_secs as i64 + 1);
        assert!(matches!(
            sessions.validate_at(&token, &config, idle),
            Err(SecurityError::Unauthenticated)
        ));
    }

    #[test]
    fn test_activity_refreshes_expiry() {
        let (sessions, _, config) = setup();
        let t0 = Utc::now();
        let token = sessions.create_at("user-1", "10.0.0.1", "sig", &config, t0).unwrap();

        // Touch the session halfway through the idle window, then verify
        // it survives past the original idle deadline.
        let touch = t0 + Duration::seconds(config.idle_secs as i64 / 2);
        sessions.validate_at(&token, &config, touch).unwrap();

        let past_original_idle = t0 + Duration::seconds(config.idle_secs as i64 + 1);
        assert!(sessions.validate_at(&token, &config, past_original_idle).is_ok());
    }

    #[test]
    fn test_revoke_is_immediate_and_idempotent() {
        let (sessions, _, config) = setup();
        let token = sessions.create("user-1", "10.0.0.1", "sig", &config).unwrap();

        sessions.revoke(&token).unwrap();
        assert!(matches!(
            sessions.validate(&token, &config),
            Err(SecurityError::Unauthenticated)
        ));
        // No error revoking a token that is already gone.
        sessions.revoke(&token).unwrap();
    }

    #[test]
    fn test_revoke_all() {
        let (sessions, _, config) = setup();
        let t1 = sessions.create("user-1", "10.0.0.1", "sig", &config).unwrap();
        let t2 = sessions.create("user-1", "10.0.0.2", "sig", &config).unwrap();

        assert_eq!(sessions.revoke_all("user-1").unwrap(), 2);
        assert!(sessions.validate(&t1, &config).is_err());
        assert!(sessions.validate(&t2, &config).is_err());
        assert_eq!(sessions.revoke_all("user-1").unwrap(), 0);
    }

    #[test]
    fn test_disabled_identity_is_rejected() {
        let (sessions, directory, config) = setup();
        let token = sessions.create("user-1", "10.0.0.1", "sig", &config).unwrap();

        directory.set_active("user-1", false);
        assert!(matches!(
            sessions.validate(&token, &config),
            Err(SecurityError::Unauthenticated)
        ));
    }

    #[test]
    fn test_store_outage_fails_closed() {
        let directory = Arc::new(MemoryDirectory::new());
        let sessions = SessionStore::new(Arc::new(UnavailableStore), directory);
        assert!(matches!(
            sessions.validate("any-token", &SessionConfig::default()),
            Err(SecurityError::Unauthenticated)
        ));
    }

    #[test]
    fn test_sweep_expired() {
        let (sessions, _, config) = setup();
        let old = Utc::now() - Duration::seconds(config.ttl_secs as i64 * 2);
        sessions.create_at("user-1", "10.0.0.1", "sig", &config, old).unwrap();
        sessions.create("user-1", "10.0.0.2", "sig", &config).unwrap();

        assert_eq!(sessions.sweep_expired(&config).unwrap(), 1);
        // Re-entrant: a second sweep finds nothing.
        assert_eq!(sessions.sweep_expired(&config).unwrap(), 0);
    }
}
