//! Application security core: sessions, RBAC, rate limiting, request
//! filtering, audit, and anomaly detection behind one context.

pub mod admin;
pub mod audit;
pub mod authz;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod security;
pub mod session;
pub mod store;

pub use config::SecurityConfig;
pub use error::SecurityError;
pub use http::SecurityServer;
pub use lifecycle::Shutdown;
pub use pipeline::{InspectableRequest, PipelineOutcome, SecurityContext};
