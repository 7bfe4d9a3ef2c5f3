//! Address blocklist shared by the request filter and admin surface.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::SecurityStore;

/// One blocked address with its (most recent) block time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockEntry {
    pub address: String,
    pub blocked_at: DateTime<Utc>,
}

/// Persistent address blocklist.
///
/// Membership checks fail open: a store fault reads as "not blocked"
/// so a degraded store does not take the whole service down.
#[derive(Clone)]
pub struct BlockList {
    store: Arc<dyn SecurityStore>,
}

impl BlockList {
    pub fn new(store: Arc<dyn SecurityStore>) -> Self {
        Self { store }
    }

    /// Add an address. Re-blocking refreshes the timestamp, which also
    /// restarts an expiry TTL if one is configured.
    pub fn block(&self, address: &str) -> Result<(), StoreError> {
        self.block_at(address, Utc::now())
    }

    pub fn block_at(&self, address: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.store.block_address(address, now)?;
        tracing::warn!(address, "Address added to blocklist");
        Ok(())
    }

    /// Membership check honoring the optional TTL. `ttl_secs = None`
    /// means entries never expire.
    pub fn is_blocked(&self, address: &str, ttl_secs: Option<u64>) -> bool {
        self.is_blocked_at(address, ttl_secs, Utc::now())
    }

    pub fn is_blocked_at(
        &self,
        address: &str,
        ttl_secs: Option<u64>,
        now: DateTime<Utc>,
    ) -> bool {
        let blocked_at = match self.store.blocked_since(address) {
            Ok(Some(at)) => at,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(error = %e, "Blocklist lookup failed, failing open");
                return false;
            }
        };

        match ttl_secs {
            Some(ttl) => now <= blocked_at + Duration::seconds(ttl as i64),
            None => true,
        }
    }

    pub fn entries(&self) -> Result<Vec<BlockEntry>, StoreError> {
        self.store.blocked_addresses()
    }

    /// Remove one address. Returns false if it was not present.
    pub fn unblock(&self, address: &str) -> Result<bool, StoreError> {
        let removed = self.store.unblock_address(address)?;
        if removed {
            tracing::info!(address, "Address removed from blocklist");
        }
        Ok(removed)
    }

    /// Drop entries older than the TTL. No-op when no TTL is set.
    pub fn prune_expired(&self, ttl_secs: Option<u64>) -> Result<usize, StoreError> {
        match ttl_secs {
            Some(ttl) => self
                .store
                .prune_blocklist(Utc::now() - Duration::seconds(ttl as i64)),
            None => Ok(0),
        }
    }
}
