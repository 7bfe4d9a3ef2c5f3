//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows > 0, thresholds > 0)
//! - Detect duplicate rule ids and endpoint overrides
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Malformed regex rules are a load-time warning, not an error; the
//!   filter skips them at compile time

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::SecurityConfig;
use crate::security::waf::RuleSet;

/// One semantic problem found in a config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration. Collects every error.
pub fn validate_config(config: &SecurityConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let nonzero: [(&str, u64); 7] = [
        ("session.ttl_secs", config.session.ttl_secs),
        ("session.idle_secs", config.session.idle_secs),
        ("rate_limit.window_secs", config.rate_limit.window_secs),
        ("rate_limit.max_requests", config.rate_limit.max_requests as u64),
        ("anomaly.window_secs", config.anomaly.window_secs),
        ("anomaly.scan_interval_secs", config.anomaly.scan_interval_secs),
        ("housekeeping.interval_secs", config.housekeeping.interval_secs),
    ];
    for (field, value) in nonzero {
        if value == 0 {
            errors.push(ValidationError {
                field: field.to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
    }

    for (field, value) in [
        ("anomaly.failure_threshold", config.anomaly.failure_threshold),
        ("anomaly.escalation_threshold", config.anomaly.escalation_threshold),
        ("anomaly.fanout_threshold", config.anomaly.fanout_threshold),
    ] {
        if value == 0 {
            errors.push(ValidationError {
                field: field.to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
    }

    let mut endpoints = HashSet::new();
    for limit in &config.rate_limit.endpoints {
        if limit.window_secs == 0 || limit.max_requests == 0 {
            errors.push(ValidationError {
                field: format!("rate_limit.endpoints[{}]", limit.endpoint),
                message: "limit and window must be greater than zero".to_string(),
            });
        }
        if !endpoints.insert(limit.endpoint.as_str()) {
            errors.push(ValidationError {
                field: format!("rate_limit.endpoints[{}]", limit.endpoint),
                message: "duplicate endpoint override".to_string(),
            });
        }
    }

    let mut rule_ids = HashSet::new();
    for rule in &config.waf.rules {
        if rule.pattern.is_empty() {
            errors.push(ValidationError {
                field: format!("waf.rules[{}]", rule.id),
                message: "empty pattern".to_string(),
            });
        }
        if !rule_ids.insert(rule.id.as_str()) {
            errors.push(ValidationError {
                field: format!("waf.rules[{}]", rule.id),
                message: "duplicate rule id".to_string(),
            });
        }
    }

    // Surface malformed regexes at load time too, as warnings.
    let (_, warnings) = RuleSet::compile(&config.waf.rules);
    for warning in warnings {
        tracing::warn!(warning, "Filter rule skipped");
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::EndpointLimit;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&SecurityConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = SecurityConfig::default();
        config.rate_limit.window_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "rate_limit.window_secs"));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = SecurityConfig::default();
        config.session.ttl_secs = 0;
        config.anomaly.failure_threshold = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_duplicate_endpoint_override_rejected() {
        let mut config = SecurityConfig::default();
        for _ in 0..2 {
            config.rate_limit.endpoints.push(EndpointLimit {
                endpoint: "/api/login".into(),
                max_requests: 5,
                window_secs: 60,
            });
        }
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("duplicate endpoint")));
    }
}
