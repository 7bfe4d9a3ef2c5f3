//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define security metrics (decisions, denials, alerts)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `security_requests_total` (counter): pipeline decisions by outcome
//! - `security_blocked_total` (counter): blocked requests by source
//! - `security_rate_limited_total` (counter): rate limit denials
//! - `security_unauthorized_total` (counter): RBAC denials
//! - `security_alerts_total` (counter): raised alerts by kind
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Labels carry bounded enums only, never client-controlled values

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::audit::anomaly::AlertKind;

/// Install the Prometheus recorder and serve scrapes on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    if let Err(e) = PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        tracing::error!(error = %e, "Failed to install metrics exporter");
    }
}

/// One pipeline decision. `outcome` is "pass", "blocked",
/// "rate_limited", or "redirected".
pub fn record_pipeline_outcome(outcome: &'static str) {
    metrics::counter!("security_requests_total", "outcome" => outcome).increment(1);
}

/// One blocked request. `source` is "blocklist" or "rule".
pub fn record_blocked(source: &'static str) {
    metrics::counter!("security_blocked_total", "source" => source).increment(1);
}

pub fn record_rate_limited() {
    metrics::counter!("security_rate_limited_total").increment(1);
}

pub fn record_unauthorized() {
    metrics::counter!("security_unauthorized_total").increment(1);
}

pub fn record_alert_raised(kind: AlertKind) {
    metrics::counter!("security_alerts_total", "kind" => kind.to_string()).increment(1);
}
