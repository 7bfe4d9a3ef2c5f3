//! Closed role and permission model.
//!
//! # Responsibilities
//! - Total ordering of roles (User < Moderator < Editor < Admin)
//! - Explicit permission sets per role (no implied supersets)
//! - Wildcard for the top role only
//!
//! # Design Decisions
//! - Roles are a closed enum, not config data: permission checks are
//!   compile-time exhaustive
//! - An unknown role name maps to the lowest role; fail-closed comes
//!   from permission absence, not identity absence

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered role set. Ordering derives from declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Editor,
    Admin,
}

impl Role {
    /// Numeric level for logging and persisted audit detail.
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Parse a role name, defaulting to the lowest role when unmapped.
    pub fn from_name_or_default(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "moderator" => Role::Moderator,
            "editor" => Role::Editor,
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }

    /// Explicit permission set for this role. Higher roles do not
    /// implicitly inherit lower sets; membership is spelled out.
    pub fn permissions(self) -> &'static [Permission] {
        match self {
            Role::User => &[Permission::ViewContent, Permission::CreateReport],
            Role::Moderator => &[
                Permission::ViewContent,
                Permission::CreateReport,
                Permission::ModerateComments,
            ],
            Role::Editor => &[
                Permission::ViewContent,
                Permission::CreateReport,
                Permission::EditReport,
                Permission::DeleteReport,
                Permission::ModerateComments,
            ],
            // Admin carries the wildcard; see has_permission.
            Role::Admin => &[],
        }
    }

    /// True iff the role's permission set contains `permission`, or the
    /// role is the top role (wildcard).
    pub fn has_permission(self, permission: Permission) -> bool {
        self == Role::Admin || self.permissions().contains(&permission)
    }

    /// A role is "elevated" if it sits above the base role. Used by the
    /// anomaly detector to classify escalation attempts.
    pub fn is_elevated(self) -> bool {
        self > Role::User
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Moderator => write!(f, "moderator"),
            Role::Editor => write!(f, "editor"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Operation permission categories checked by the authorizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewContent,
    CreateReport,
    EditReport,
    DeleteReport,
    ModerateComments,
    ManageUsers,
    ViewAuditLog,
    ResolveAlerts,
    ManageRules,
}
