//! Security pipeline orchestration.
//!
//! # Data Flow
//! ```text
//! Incoming request (HTTP layer or embedding application)
//!     → InspectableRequest (transport-neutral view)
//!     → request filter (blocklist, then rules)
//!     → rate limiter (per client key, per endpoint limits)
//!     → PipelineOutcome consumed by the caller
//! ```
//!
//! # Design Decisions
//! - One `SecurityContext` owns every component; no global state
//! - Config is swapped atomically; a request finishes under the config
//!   it started with
//! - Filter runs before the rate limiter so blocked sources never
//!   consume rate budget

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::audit::anomaly::AnomalyDetector;
use crate::audit::log::{Actor, AuditAction, AuditLog};
use crate::authz::{Authorizer, IdentityProvider, OwnershipResolver};
use crate::config::SecurityConfig;
use crate::observability::metrics;
use crate::security::rate_limit::{identity_key, RateLimiter};
use crate::security::waf::{FilterDecision, RequestFilter, RuleSet};
use crate::security::BlockList;
use crate::session::SessionStore;
use crate::store::SecurityStore;

/// Transport-neutral view of one request, as the pipeline sees it.
#[derive(Debug, Clone)]
pub struct InspectableRequest {
    pub method: String,
    pub path: String,
    /// Rate limit grouping key. Defaults to the path when absent.
    pub endpoint: Option<String>,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub client_address: String,
    pub client_signature: String,
}

impl InspectableRequest {
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(&self.path)
    }

    /// Single lowercased buffer the filter rules match against.
    pub fn matchable_buffer(&self) -> String {
        let mut buffer = String::with_capacity(
            self.method.len() + self.path.len() + self.body.len() + 64,
        );
        buffer.push_str(&self.method);
        buffer.push(' ');
        buffer.push_str(&self.path);
        if let Some(query) = &self.query {
            buffer.push('?');
            buffer.push_str(query);
        }
        for (name, value) in &self.headers {
            buffer.push('\n');
            buffer.push_str(name);
            buffer.push(':');
            buffer.push_str(value);
        }
        buffer.push('\n');
        buffer.push_str(&self.body);
        buffer.to_lowercase()
    }
}

/// Why the pipeline denied a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    Blocklisted,
    RuleMatched { rule_id: String },
    RateLimited,
}

/// Final pipeline verdict for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Pass,
    Blocked(DenyReason),
    Redirected { location: String },
}

/// Every security component behind one handle. Cloned cheaply via
/// `Arc` into the HTTP layer, background tasks, and the admin surface.
pub struct SecurityContext {
    pub config: ArcSwap<SecurityConfig>,
    pub store: Arc<dyn SecurityStore>,
    pub sessions: SessionStore,
    pub authorizer: Authorizer,
    pub rate_limiter: RateLimiter,
    pub filter: RequestFilter,
    pub audit: AuditLog,
    pub detector: AnomalyDetector,
}

impl SecurityContext {
    /// Wire all components over one store, compile the configured
    /// filter rules, and return the shared context.
    pub fn new(
        config: SecurityConfig,
        store: Arc<dyn SecurityStore>,
        identities: Arc<dyn IdentityProvider>,
        ownership: Arc<dyn OwnershipResolver>,
    ) -> Arc<Self> {
        let audit = AuditLog::new(store.clone());
        let sessions = SessionStore::new(store.clone(), identities);
        let authorizer = Authorizer::new(sessions.clone(), ownership, audit.clone());
        let rate_limiter = RateLimiter::new(store.clone());
        let filter = RequestFilter::new(BlockList::new(store.clone()), audit.clone());
        let detector = AnomalyDetector::new(store.clone());

        let (rules, warnings) = RuleSet::compile(&config.waf.rules);
        for warning in warnings {
            tracing::warn!(warning, "Filter rule skipped");
        }
        filter.install_rules(rules);

        Arc::new(Self {
            config: ArcSwap::from_pointee(config),
            store,
            sessions,
            authorizer,
            rate_limiter,
            filter,
            audit,
            detector,
        })
    }

    /// Swap in a validated config and recompile the filter rules.
    /// In-flight requests finish under the previous config.
    pub fn apply_config(&self, config: SecurityConfig) {
        let (rules, warnings) = RuleSet::compile(&config.waf.rules);
        for warning in warnings {
            tracing::warn!(warning, "Filter rule skipped");
        }
        self.filter.install_rules(rules);
        self.config.store(Arc::new(config));
        tracing::info!("Security configuration applied");
    }

    /// Run one request through filter and rate limiter.
    pub fn run_security_pipeline(&self, request: &InspectableRequest) -> PipelineOutcome {
        let config = self.config.load();

        match self.filter.inspect(request, &config.waf) {
            FilterDecision::Pass => {}
            FilterDecision::Blocked { rule_id } => {
                metrics::record_pipeline_outcome("blocked");
                return PipelineOutcome::Blocked(match rule_id {
                    Some(rule_id) => DenyReason::RuleMatched { rule_id },
                    None => DenyReason::Blocklisted,
                });
            }
            FilterDecision::Redirected { location } => {
                metrics::record_pipeline_outcome("redirected");
                return PipelineOutcome::Redirected { location };
            }
        }

        if config.rate_limit.enabled {
            let endpoint = request.endpoint();
            let (max_requests, window_secs) = config.rate_limit.limit_for(endpoint);
            let key = identity_key(&request.client_address, &request.client_signature, endpoint);

            if !self.rate_limiter.allow(&key, max_requests, window_secs) {
                self.audit.record(
                    &Actor::anonymous(
                        request.client_address.clone(),
                        request.client_signature.clone(),
                    ),
                    AuditAction::RateLimitExceeded,
                    None,
                    serde_json::json!({ "endpoint": endpoint, "limit": max_requests }),
                );
                metrics::record_rate_limited();
                metrics::record_pipeline_outcome("rate_limited");
                return PipelineOutcome::Blocked(DenyReason::RateLimited);
            }
        }

        metrics::record_pipeline_outcome("pass");
        PipelineOutcome::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::log::Severity;
    use crate::config::schema::EndpointLimit;
    use crate::security::waf::{PatternKind, RuleAction, WafRule};
    use crate::store::memory::{MemoryDirectory, MemoryStore};

    fn context(config: SecurityConfig) -> (Arc<SecurityContext>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(MemoryDirectory::new());
        let ctx = SecurityContext::new(config, store.clone(), directory.clone(), directory);
        (ctx, store)
    }

    fn request(path: &str, body: &str) -> InspectableRequest {
        InspectableRequest {
            method: "POST".into(),
            path: path.into(),
            endpoint: None,
            query: None,
            headers: vec![],
            body: body.into(),
            client_address: "198.51.100.20".into(),
            client_signature: "sig".into(),
        }
    }

    #[test]
    fn test_clean_request_passes() {
        let (ctx, _) = context(SecurityConfig::default());
        assert_eq!(
            ctx.run_security_pipeline(&request("/api/reports", "hello")),
            PipelineOutcome::Pass
        );
    }

    #[test]
    fn test_rule_block_then_blocklist_block() {
        let mut config = SecurityConfig::default();
        config.waf.rules.push(WafRule {
            id: "sqli-1".into(),
            pattern: "union select".into(),
            pattern_kind: PatternKind::Substring,
            severity: Severity::High,
            action: RuleAction::Block,
            active: true,
        });
        let (ctx, _) = context(config);

        assert_eq!(
            ctx.run_security_pipeline(&request("/q", "UNION SELECT *")),
            PipelineOutcome::Blocked(DenyReason::RuleMatched { rule_id: "sqli-1".into() })
        );
        // The source is now blocklisted; a clean request is denied.
        assert_eq!(
            ctx.run_security_pipeline(&request("/q", "clean")),
            PipelineOutcome::Blocked(DenyReason::Blocklisted)
        );
    }

    #[test]
    fn test_per_endpoint_rate_limit_and_audit() {
        let mut config = SecurityConfig::default();
        config.waf.enabled = false;
        config.rate_limit.endpoints.push(EndpointLimit {
            endpoint: "/api/login".into(),
            max_requests: 2,
            window_secs: 60,
        });
        let (ctx, store) = context(config);

        let req = request("/api/login", "");
        assert_eq!(ctx.run_security_pipeline(&req), PipelineOutcome::Pass);
        assert_eq!(ctx.run_security_pipeline(&req), PipelineOutcome::Pass);
        assert_eq!(
            ctx.run_security_pipeline(&req),
            PipelineOutcome::Blocked(DenyReason::RateLimited)
        );

        // Other endpoints still use the default budget.
        assert_eq!(
            ctx.run_security_pipeline(&request("/api/reports", "")),
            PipelineOutcome::Pass
        );

        let entries = store
            .audit_since(chrono::Utc::now() - chrono::Duration::minutes(1))
            .unwrap();
        assert!(entries
            .iter()
            .any(|e| e.action == AuditAction::RateLimitExceeded));
    }

    #[test]
    fn test_disabled_rate_limit_passes_everything() {
        let mut config = SecurityConfig::default();
        config.rate_limit.enabled = false;
        config.rate_limit.max_requests = 1;
        let (ctx, _) = context(config);

        for _ in 0..5 {
            assert_eq!(
                ctx.run_security_pipeline(&request("/api/reports", "")),
                PipelineOutcome::Pass
            );
        }
    }

    #[test]
    fn test_apply_config_swaps_rules() {
        let (ctx, _) = context(SecurityConfig::default());
        assert_eq!(
            ctx.run_security_pipeline(&request("/q", "union select")),
            PipelineOutcome::Pass
        );

        let mut config = SecurityConfig::default();
        config.waf.rules.push(WafRule {
            id: "sqli-1".into(),
            pattern: "union select".into(),
            pattern_kind: PatternKind::Substring,
            severity: Severity::High,
            action: RuleAction::Block,
            active: true,
        });
        ctx.apply_config(config);

        assert!(matches!(
            ctx.run_security_pipeline(&request("/q", "union select")),
            PipelineOutcome::Blocked(_)
        ));
    }
}
