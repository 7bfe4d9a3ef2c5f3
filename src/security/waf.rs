//! Request filtering against configured attack patterns.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → blocklist membership (cheap, checked first)
//!     → compiled rule set, highest severity first, first match wins
//!     → pass / block (+ blocklist the source) / redirect
//! ```
//!
//! # Design Decisions
//! - Rules compile once per config install; a malformed regex skips
//!   that rule and surfaces a warning instead of failing the reload
//! - Matching runs over one lowercased buffer of the request line,
//!   headers, and body

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::audit::log::{Actor, AuditAction, AuditLog, Severity};
use crate::config::WafConfig;
use crate::observability::metrics;
use crate::pipeline::InspectableRequest;
use crate::security::blocklist::BlockList;

/// How a rule's pattern is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Regex,
    Substring,
}

/// What happens when a rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Block,
    Redirect,
    Log,
}

fn default_active() -> bool {
    true
}

/// One configured filter rule, as it appears in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WafRule {
    pub id: String,
    pub pattern: String,
    pub pattern_kind: PatternKind,
    pub severity: Severity,
    pub action: RuleAction,
    #[serde(default = "default_active")]
    pub active: bool,
}

enum RuleMatcher {
    Regex(regex::Regex),
    Substring(String),
}

impl RuleMatcher {
    fn matches(&self, buffer: &str) -> bool {
        match self {
            RuleMatcher::Regex(re) => re.is_match(buffer),
            RuleMatcher::Substring(needle) => buffer.contains(needle.as_str()),
        }
    }
}

struct CompiledRule {
    id: String,
    matcher: RuleMatcher,
    severity: Severity,
    action: RuleAction,
}

/// An ordered, compiled set of active rules.
#[derive(Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile active rules, highest severity first. Malformed regexes
    /// are skipped; each skip produces one warning string.
    pub fn compile(rules: &[WafRule]) -> (Self, Vec<String>) {
        let mut compiled = Vec::new();
        let mut warnings = Vec::new();

        for rule in rules.iter().filter(|r| r.active) {
            let matcher = match rule.pattern_kind {
                PatternKind::Regex => match regex::RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()
                {
                    Ok(re) => RuleMatcher::Regex(re),
                    Err(e) => {
                        warnings.push(format!("rule {}: invalid regex: {}", rule.id, e));
                        continue;
                    }
                },
                PatternKind::Substring => RuleMatcher::Substring(rule.pattern.to_lowercase()),
            };
            compiled.push(CompiledRule {
                id: rule.id.clone(),
                matcher,
                severity: rule.severity,
                action: rule.action,
            });
        }

        // Stable sort keeps config order within one severity tier.
        compiled.sort_by(|a, b| b.severity.cmp(&a.severity));
        (Self { rules: compiled }, warnings)
    }

    fn first_match(&self, buffer: &str) -> Option<&CompiledRule> {
        self.rules.iter().find(|rule| rule.matcher.matches(buffer))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Outcome of one filter inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Pass,
    /// `rule_id` is `None` when the block came from the blocklist.
    Blocked { rule_id: Option<String> },
    Redirected { location: String },
}

/// Blocklist gate plus rule matching, sharing one audit trail.
pub struct RequestFilter {
    blocklist: BlockList,
    audit: AuditLog,
    rules: ArcSwap<RuleSet>,
}

impl RequestFilter {
    pub fn new(blocklist: BlockList, audit: AuditLog) -> Self {
        Self {
            blocklist,
            audit,
            rules: ArcSwap::from_pointee(RuleSet::default()),
        }
    }

    /// Swap in a freshly compiled rule set. Requests in flight finish
    /// against the set they started with.
    pub fn install_rules(&self, rules: RuleSet) {
        tracing::info!(rules = rules.len(), "Filter rule set installed");
        self.rules.store(Arc::new(rules));
    }

    pub fn blocklist(&self) -> &BlockList {
        &self.blocklist
    }

    /// Inspect one request. Blocklisted sources are rejected before any
    /// rule evaluation; rule matching is skipped when the filter is
    /// disabled in config.
    pub fn inspect(&self, request: &InspectableRequest, config: &WafConfig) -> FilterDecision {
        let actor = Actor::anonymous(
            request.client_address.clone(),
            request.client_signature.clone(),
        );

        if self
            .blocklist
            .is_blocked(&request.client_address, config.block_ttl_secs)
        {
            self.audit.record(
                &actor,
                AuditAction::RequestBlocked,
                None,
                serde_json::json!({ "path": request.path, "source": "blocklist" }),
            );
            metrics::record_blocked("blocklist");
            return FilterDecision::Blocked { rule_id: None };
        }

        if !config.enabled {
            return FilterDecision::Pass;
        }

        let rules = self.rules.load();
        let buffer = request.matchable_buffer();
        let Some(rule) = rules.first_match(&buffer) else {
            return FilterDecision::Pass;
        };

        match rule.action {
            RuleAction::Log => {
                self.audit.record_with_severity(
                    &actor,
                    AuditAction::RuleMatched,
                    None,
                    serde_json::json!({ "rule_id": rule.id, "path": request.path }),
                    rule.severity,
                );
                FilterDecision::Pass
            }
            RuleAction::Block => {
                if let Err(e) = self.blocklist.block(&request.client_address) {
                    tracing::warn!(error = %e, "Blocklist write failed after rule match");
                }
                // A rule block is never logged below High, whatever the
                // rule's own severity says.
                self.audit.record_with_severity(
                    &actor,
                    AuditAction::RequestBlocked,
                    None,
                    serde_json::json!({ "rule_id": rule.id, "path": request.path }),
                    rule.severity.max(Severity::High),
                );
                metrics::record_blocked("rule");
                FilterDecision::Blocked {
                    rule_id: Some(rule.id.clone()),
                }
            }
            RuleAction::Redirect => {
                self.audit.record_with_severity(
                    &actor,
                    AuditAction::RequestRedirected,
                    None,
                    serde_json::json!({ "rule_id": rule.id, "path": request.path }),
                    rule.severity,
                );
                FilterDecision::Redirected {
                    location: config.redirect_location.clone(),
                }
            }
        }
    }
}
