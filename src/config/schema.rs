//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! security core. All types derive Serde traits for deserialization
//! from config files.

use serde::{Deserialize, Serialize};

use crate::security::waf::WafRule;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SecurityConfig {
    /// Listener configuration (bind address, connection cap).
    pub listener: ListenerConfig,

    /// Session lifetime settings.
    pub session: SessionConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Request filter configuration and rules.
    pub waf: WafConfig,

    /// Audit log retention.
    pub audit: AuditConfig,

    /// Anomaly detection thresholds.
    pub anomaly: AnomalyConfig,

    /// Housekeeping cadence.
    pub housekeeping: HousekeepingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Peer addresses allowed to set `X-Forwarded-For`. Forwarding
    /// headers from any other peer are ignored.
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
            request_timeout_secs: 30,
            trusted_proxies: Vec::new(),
        }
    }
}

/// Session lifetime configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Absolute session lifetime in seconds, refreshed on activity.
    pub ttl_secs: u64,

    /// Idle cutoff in seconds since last activity.
    pub idle_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 7 * 24 * 3600,
            idle_secs: 24 * 3600,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Default per-key request cap within one window.
    pub max_requests: u32,

    /// Default trailing window length in seconds.
    pub window_secs: u64,

    /// Per-endpoint overrides. First exact match wins.
    #[serde(default)]
    pub endpoints: Vec<EndpointLimit>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_secs: 60,
            endpoints: Vec::new(),
        }
    }
}

/// A per-endpoint rate limit override.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointLimit {
    /// Endpoint identifier, matched exactly (e.g., "/api/login").
    pub endpoint: String,

    pub max_requests: u32,

    pub window_secs: u64,
}

impl RateLimitConfig {
    /// Effective (max_requests, window_secs) for an endpoint.
    pub fn limit_for(&self, endpoint: &str) -> (u32, u64) {
        self.endpoints
            .iter()
            .find(|limit| limit.endpoint == endpoint)
            .map(|limit| (limit.max_requests, limit.window_secs))
            .unwrap_or((self.max_requests, self.window_secs))
    }
}

/// Request filter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WafConfig {
    /// Enable rule matching. The blocklist is enforced regardless.
    pub enabled: bool,

    /// Target for redirect-action rules.
    pub redirect_location: String,

    /// Optional blocklist entry lifetime in seconds. Absent means
    /// entries persist until removed by an operator.
    pub block_ttl_secs: Option<u64>,

    /// Filter rules.
    #[serde(default)]
    pub rules: Vec<WafRule>,
}

impl Default for WafConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redirect_location: "/".to_string(),
            block_ttl_secs: None,
            rules: Vec::new(),
        }
    }
}

/// Audit log retention configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Days of audit history kept by the housekeeping pass.
    pub retention_days: u32,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { retention_days: 90 }
    }
}

/// Anomaly detection thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Trailing window scanned per pass, in seconds.
    pub window_secs: u64,

    /// Failed-login count per address that raises a brute-force alert.
    pub failure_threshold: u32,

    /// Elevated-role denial count per identity that raises an
    /// escalation alert.
    pub escalation_threshold: u32,

    /// Distinct address count per identity that raises a fanout alert.
    pub fanout_threshold: u32,

    /// Seconds between automatic scans.
    pub scan_interval_secs: u64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            window_secs: 3600,
            failure_threshold: 5,
            escalation_threshold: 3,
            fanout_threshold: 5,
            scan_interval_secs: 300,
        }
    }
}

/// Housekeeping cadence.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HousekeepingConfig {
    /// Seconds between sweep passes.
    pub interval_secs: u64,
}

impl Default for HousekeepingConfig {
    fn default() -> Self {
        Self { interval_secs: 300 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
