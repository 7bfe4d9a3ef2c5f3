//! Role-based authorization with resource-ownership override.
//!
//! # Data Flow
//! ```text
//! Business handler:
//!     → require_role(token, role)
//!     → require_permission(token, permission)
//!     → require_ownership_or_role(token, type, id, fallback)
//!
//! Each guard:
//!     → session validation (fail closed)
//!     → role / permission / ownership check
//!     → UNAUTHORIZED_ACCESS audit entry on denial
//! ```
//!
//! # Design Decisions
//! - Ownership lookups delegate to the business layer; an ownership
//!   store error reads as "not the owner"
//! - Denials always audit before failing, so escalation attempts are
//!   visible to the anomaly detector

pub mod roles;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::audit::log::{Actor, AuditAction, AuditLog};
use crate::config::SessionConfig;
use crate::error::{SecurityError, StoreError};
use crate::observability::metrics;
use crate::session::SessionStore;

pub use roles::{Permission, Role};

/// The authenticated principal behind a request. Owned by the business
/// layer; this core only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    pub active: bool,
}

/// Business-layer lookup of identities by id.
pub trait IdentityProvider: Send + Sync {
    fn fetch(&self, identity_id: &str) -> Result<Option<Identity>, StoreError>;
}

/// Business-layer lookup answering "does this identity own the resource".
pub trait OwnershipResolver: Send + Sync {
    fn is_owner(
        &self,
        identity_id: &str,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<bool, StoreError>;
}

/// RBAC guard consuming session-store output.
#[derive(Clone)]
pub struct Authorizer {
    sessions: SessionStore,
    ownership: Arc<dyn OwnershipResolver>,
    audit: AuditLog,
}

impl Authorizer {
    pub fn new(
        sessions: SessionStore,
        ownership: Arc<dyn OwnershipResolver>,
        audit: AuditLog,
    ) -> Self {
        Self { sessions, ownership, audit }
    }

    /// True iff the identity's role level meets the requirement.
    pub fn has_role(identity: &Identity, required: Role) -> bool {
        identity.role >= required
    }

    /// True iff the role's explicit permission set (or the top-role
    /// wildcard) contains the permission.
    pub fn has_permission(identity: &Identity, permission: Permission) -> bool {
        identity.role.has_permission(permission)
    }

    /// Delegated ownership check. A resolver error reads as false.
    pub fn is_owner(&self, identity: &Identity, resource_type: &str, resource_id: &str) -> bool {
        match self.ownership.is_owner(&identity.id, resource_type, resource_id) {
            Ok(owned) => owned,
            Err(e) => {
                tracing::warn!(error = %e, resource_type, resource_id, "Ownership lookup failed");
                false
            }
        }
    }

    /// Validate the session and require a minimum role. Denials audit
    /// as `UNAUTHORIZED_ACCESS` before failing.
    pub fn require_role(
        &self,
        token: &str,
        required: Role,
        config: &SessionConfig,
    ) -> Result<Identity, SecurityError> {
        let (identity, session) = self.sessions.validate_full(token, config)?;

        if Self::has_role(&identity, required) {
            return Ok(identity);
        }

        self.audit_denial(
            &identity,
            &session.client_address,
            &session.client_signature,
            serde_json::json!({ "required_role": required.to_string() }),
        );
        Err(SecurityError::Forbidden {
            reason: format!("requires role {}", required),
        })
    }

    /// Validate the session and require a specific permission.
    pub fn require_permission(
        &self,
        token: &str,
        permission: Permission,
        config: &SessionConfig,
    ) -> Result<Identity, SecurityError> {
        let (identity, session) = self.sessions.validate_full(token, config)?;

        if Self::has_permission(&identity, permission) {
            return Ok(identity);
        }

        self.audit_denial(
            &identity,
            &session.client_address,
            &session.client_signature,
            serde_json::json!({ "required_permission": permission }),
        );
        Err(SecurityError::Forbidden {
            reason: "missing permission".to_string(),
        })
    }

    /// Succeed if the identity owns the resource or holds the fallback
    /// role. The owner passes even with only the base role.
    pub fn require_ownership_or_role(
        &self,
        token: &str,
        resource_type: &str,
        resource_id: &str,
        fallback_role: Role,
        config: &SessionConfig,
    ) -> Result<Identity, SecurityError> {
        let (identity, session) = self.sessions.validate_full(token, config)?;

        if self.is_owner(&identity, resource_type, resource_id)
            || Self::has_role(&identity, fallback_role)
        {
            return Ok(identity);
        }

        self.audit.record(
            &Actor {
                identity_id: Some(identity.id.clone()),
                role: Some(identity.role),
                client_address: session.client_address.clone(),
                client_signature: session.client_signature.clone(),
            },
            AuditAction::UnauthorizedAccess,
            Some((resource_type, resource_id)),
            serde_json::json!({ "required_role": fallback_role.to_string(), "ownership": false }),
        );
        metrics::record_unauthorized();
        Err(SecurityError::Forbidden {
            reason: "not owner and insufficient role".to_string(),
        })
    }

    fn audit_denial(
        &self,
        identity: &Identity,
        client_address: &str,
        client_signature: &str,
        detail: serde_json::Value,
    ) {
        self.audit.record(
            &Actor {
                identity_id: Some(identity.id.clone()),
                role: Some(identity.role),
                client_address: client_address.to_string(),
                client_signature: client_signature.to_string(),
            },
            AuditAction::UnauthorizedAccess,
            None,
            detail,
        );
        metrics::record_unauthorized();
    }
}
