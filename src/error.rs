//! Error taxonomy for the security core.
//!
//! # Design Decisions
//! - Deny decisions are terminal for the request and carry a
//!   machine-readable reason code
//! - Store failures are a separate type so callers can choose
//!   fail-open (rate limiter, WAF) or fail-closed (sessions)
//! - Configuration problems are logged, never surfaced to clients

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors raised by the persistent store backing all durable state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store operation timed out")]
    Timeout,
}

/// Terminal security decisions and internal failures.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// No session, invalid token, expired session, or disabled identity.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Valid session, but insufficient role/permission/ownership.
    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    /// Request quota exceeded for this client/endpoint.
    #[error("rate limited")]
    RateLimited,

    /// WAF rule match or blocklisted address.
    #[error("blocked: {reason}")]
    Blocked { reason: String },

    /// Malformed rule or invalid config value. Logged, not shown to clients.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SecurityError {
    /// Stable reason code surfaced to callers.
    pub fn reason_code(&self) -> &'static str {
        match self {
            SecurityError::Unauthenticated => "unauthenticated",
            SecurityError::Forbidden { .. } => "forbidden",
            SecurityError::RateLimited => "rate_limited",
            SecurityError::Blocked { .. } => "blocked",
            SecurityError::Configuration(_) => "configuration_error",
            SecurityError::Store(_) => "store_error",
        }
    }
}

impl IntoResponse for SecurityError {
    fn into_response(self) -> Response {
        let status = match &self {
            SecurityError::Unauthenticated => StatusCode::UNAUTHORIZED,
            SecurityError::Forbidden { .. } => StatusCode::FORBIDDEN,
            SecurityError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            SecurityError::Blocked { .. } => StatusCode::FORBIDDEN,
            // Internal faults are not detailed to the client.
            SecurityError::Configuration(_) | SecurityError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = json!({ "error": self.reason_code() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes() {
        assert_eq!(SecurityError::Unauthenticated.reason_code(), "unauthenticated");
        assert_eq!(SecurityError::RateLimited.reason_code(), "rate_limited");
        assert_eq!(
            SecurityError::Forbidden { reason: "role".into() }.reason_code(),
            "forbidden"
        );
    }

    #[test]
    fn test_status_mapping() {
        let resp = SecurityError::RateLimited.into_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

        let resp = SecurityError::Unauthenticated.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = SecurityError::Blocked { reason: "blocklist".into() }.into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
