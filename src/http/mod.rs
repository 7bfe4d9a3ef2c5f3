//! HTTP enforcement subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, timeouts, tracing)
//!     → middleware/guard.rs (buffer, inspect, deny or forward)
//!     → application handlers (identity attached when authenticated)
//! ```

pub mod middleware;
pub mod server;

pub use server::SecurityServer;
