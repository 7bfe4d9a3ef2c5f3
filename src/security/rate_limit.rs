//! Fixed-lookback request rate limiting.
//!
//! Counts hit events over a trailing window per composite client key.
//! There is no bucket boundary: every check looks back exactly
//! `window_secs` from now, so a burst cannot slip through a reset.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

use crate::store::SecurityStore;

/// Composite key identifying one client on one endpoint. The client
/// signature is hashed so raw fingerprints never become store keys.
pub fn identity_key(client_address: &str, client_signature: &str, endpoint: &str) -> String {
    let digest = Sha256::digest(client_signature.as_bytes());
    format!("{}|{}|{}", client_address, hex::encode(&digest[..8]), endpoint)
}

/// Store-backed rate limiter.
///
/// Availability beats strictness here: a store fault reads as "allowed"
/// so a degraded store throttles nothing.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn SecurityStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn SecurityStore>) -> Self {
        Self { store }
    }

    /// Check and consume one request slot for `key`. Returns false when
    /// the key already spent `max_requests` within the trailing window.
    /// Denied requests are not recorded as hits.
    pub fn allow(&self, key: &str, max_requests: u32, window_secs: u64) -> bool {
        self.allow_at(key, max_requests, window_secs, Utc::now())
    }

    pub fn allow_at(
        &self,
        key: &str,
        max_requests: u32,
        window_secs: u64,
        now: DateTime<Utc>,
    ) -> bool {
        let window = Duration::seconds(window_secs as i64);
        let count = match self.store.count_hits(key, now - window) {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "Rate limit count failed, failing open");
                return true;
            }
        };

        if count >= max_requests {
            return false;
        }

        if let Err(e) = self.store.record_hit(key, now) {
            tracing::warn!(error = %e, "Rate limit hit record failed, failing open");
            return true;
        }
        // Opportunistic cleanup keeps hot keys from growing unbounded
        // between housekeeping passes.
        let _ = self.store.prune_hits(key, now - window * 2);
        true
    }
}
