//! Audit trail subsystem.
//!
//! # Data Flow
//! ```text
//! All security components produce:
//!     → log.rs (append-only entries, severity derived from action)
//!     → SecurityStore (persisted rows)
//!
//! Consumers:
//!     → anomaly.rs (threshold scans over a trailing window)
//!     → admin API (alert listing / resolution)
//! ```
//!
//! # Design Decisions
//! - Audit writes never abort the caller's primary operation; failures
//!   fall back to a local tracing event
//! - Entries are append-only; only retention pruning removes them
//! - Severity comes from a static action table, not caller input

pub mod anomaly;
pub mod log;

pub use anomaly::{AlertKind, AnomalyDetector, SecurityAlert};
pub use log::{AuditAction, AuditLog, AuditLogEntry, Severity};
