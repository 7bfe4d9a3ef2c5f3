//! Background housekeeping and scheduled anomaly scans.
//!
//! # Responsibilities
//! - Sweep expired sessions
//! - Prune stale rate limit hits, audit rows, and blocklist entries
//! - Run the anomaly detector on its own cadence
//!
//! Every pass is idempotent; a missed or doubled tick changes nothing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;

use crate::pipeline::SecurityContext;
use crate::store::SecurityStore;

/// Periodic maintenance task over the shared store.
pub struct Housekeeping {
    ctx: Arc<SecurityContext>,
}

impl Housekeeping {
    pub fn new(ctx: Arc<SecurityContext>) -> Self {
        Self { ctx }
    }

    /// Run until the shutdown signal fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let config = self.ctx.config.load_full();
        let mut sweep = tokio::time::interval(Duration::from_secs(config.housekeeping.interval_secs));
        let mut scan = tokio::time::interval(Duration::from_secs(config.anomaly.scan_interval_secs));

        loop {
            tokio::select! {
                _ = sweep.tick() => self.sweep_pass(),
                _ = scan.tick() => {
                    let config = self.ctx.config.load();
                    self.ctx.detector.scan(&config.anomaly);
                }
                _ = shutdown.recv() => {
                    tracing::info!("Housekeeping stopping");
                    return;
                }
            }
        }
    }

    /// One maintenance pass. Store errors are logged and retried on the
    /// next tick.
    pub fn sweep_pass(&self) {
        let config = self.ctx.config.load();
        let now = Utc::now();

        match self.ctx.sessions.sweep_expired(&config.session) {
            Ok(removed) if removed > 0 => {
                tracing::debug!(removed, "Expired sessions swept");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Session sweep failed"),
        }

        // Hits older than twice the widest window can never influence a
        // rate decision again.
        let widest_window = config
            .rate_limit
            .endpoints
            .iter()
            .map(|limit| limit.window_secs)
            .chain([config.rate_limit.window_secs])
            .max()
            .unwrap_or(config.rate_limit.window_secs);
        if let Err(e) = self
            .ctx
            .store
            .prune_all_hits(now - chrono::Duration::seconds(2 * widest_window as i64))
        {
            tracing::warn!(error = %e, "Rate hit pruning failed");
        }

        let retention = chrono::Duration::days(config.audit.retention_days as i64);
        if let Err(e) = self.ctx.audit.prune_before(now - retention) {
            tracing::warn!(error = %e, "Audit pruning failed");
        }

        if let Err(e) = self
            .ctx
            .filter
            .blocklist()
            .prune_expired(config.waf.block_ttl_secs)
        {
            tracing::warn!(error = %e, "Blocklist pruning failed");
        }
    }
}
