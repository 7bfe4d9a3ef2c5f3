//! Perimeter enforcement: blocklist, rate limiting, request filtering.

pub mod blocklist;
pub mod rate_limit;
pub mod waf;

pub use blocklist::{BlockEntry, BlockList};
pub use rate_limit::RateLimiter;
pub use waf::{FilterDecision, RequestFilter, RuleSet, WafRule};
