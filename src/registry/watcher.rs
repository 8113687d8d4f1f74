//! Periodic rescanning on a background task.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::BundleRegistry;

/// Shortest period the watcher ticks at.
pub const MIN_WATCH_INTERVAL: Duration = Duration::from_millis(1);

impl BundleRegistry {
    /// Rescans every `interval` until `token` is cancelled.
    ///
    /// The first rescan happens immediately. Intervals shorter than
    /// [`MIN_WATCH_INTERVAL`], including zero, are raised to it.
    pub fn spawn_watcher(
        self: Arc<Self>,
        interval: Duration,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        if interval < MIN_WATCH_INTERVAL {
            tracing::warn!(
                requested_ms = interval.as_millis() as u64,
                "Watcher interval too short, using minimum"
            );
        }
        let interval = interval.max(MIN_WATCH_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::debug!(
                base = %self.base_dir().display(),
                interval_ms = interval.as_millis() as u64,
                "Bundle watcher started"
            );

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let report = self.rescan().await;
                        if report.has_changes() {
                            tracing::debug!(
                                installed = report.installed.len(),
                                unloaded = report.unloaded.len(),
                                "Bundle watcher applied changes"
                            );
                        }
                    }
                }
            }

            tracing::debug!(base = %self.base_dir().display(), "Bundle watcher stopped");
        })
    }
}
