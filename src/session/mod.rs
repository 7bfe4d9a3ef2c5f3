//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! Credential verification (external)
//!     → store.rs create() → opaque token handed to the client
//!
//! Every authenticated request:
//!     → store.rs validate() → sliding renewal, identity lookup
//!
//! Logout / revocation / housekeeping:
//!     → revoke(), revoke_all(), sweep_expired()
//! ```
//!
//! # Design Decisions
//! - Tokens are opaque 32-byte random values, hex-encoded
//! - Validation fails closed: a store error reads as Unauthenticated
//! - Expiry combines an absolute TTL (refreshed on activity) with an
//!   idle-sliding component

pub mod store;
pub mod token;

pub use store::{Session, SessionStore};
