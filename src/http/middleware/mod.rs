//! HTTP middleware layers.

pub mod guard;

pub use guard::{bearer_token, security_guard};
