//! Configuration file watcher for hot reload.
//!
//! Reloads go through the same load-and-validate path as startup, so a
//! broken edit is rejected and the running configuration stays in
//! place. Accepted reloads are summarized in the log before they are
//! handed to the apply loop.

use std::path::Path;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::SecurityConfig;

/// Watch a configuration file and emit each validated reload.
///
/// The returned watcher handle must be kept alive; dropping it stops
/// the watch.
pub fn watch_config(
    path: &Path,
) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<SecurityConfig>), notify::Error> {
    let (tx, rx) = mpsc::unbounded_channel();
    let watched = path.to_path_buf();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!(error = %e, "Config watch error");
                    return;
                }
            };
            if !event.kind.is_modify() && !event.kind.is_create() {
                return;
            }
            match load_config(&watched) {
                Ok(config) => {
                    tracing::info!(
                        waf_rules = config.waf.rules.len(),
                        endpoint_limits = config.rate_limit.endpoints.len(),
                        rate_limit_enabled = config.rate_limit.enabled,
                        "Config file reloaded"
                    );
                    let _ = tx.send(config);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Config reload rejected, keeping current configuration");
                }
            }
        },
        Config::default().with_poll_interval(Duration::from_secs(2)),
    )?;

    watcher.watch(path, RecursiveMode::NonRecursive)?;
    tracing::info!(path = ?path, "Config watcher started");
    Ok((watcher, rx))
}
