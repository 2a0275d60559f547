//! Expiry sweeper
//!
//! A recurring task that evicts sales older than the TTL from the head of
//! the window. With a period shorter than the TTL, a sale outlives its
//! nominal expiry by at most one period.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::WindowConfig;
use crate::metrics::WindowMetrics;
use crate::window::SharedWindow;

/// Periodic evictor for a shared window.
#[derive(Clone)]
pub struct ExpirySweeper {
    window: SharedWindow,
    ttl: Duration,
    interval: Duration,
    metrics: Arc<WindowMetrics>,
}

impl ExpirySweeper {
    pub fn new(window: SharedWindow, config: &WindowConfig, metrics: Arc<WindowMetrics>) -> Self {
        Self {
            window,
            ttl: config.item_expiry,
            interval: config.cleanup_interval,
            metrics,
        }
    }

    /// Run a single sweep as of `now`. Returns the number of evictions.
    pub fn sweep_once(&self, now: Instant) -> usize {
        let evicted = self.window.evict_expired(now, self.ttl);
        self.metrics.record_sweep(evicted.len());

        if !evicted.is_empty() {
            debug!(
                evicted = evicted.len(),
                window_size = self.window.len(),
                "Sweep evicted expired sales"
            );
        }
        evicted.len()
    }

    /// Start sweeping on the current tokio runtime.
    ///
    /// The first sweep happens one period after spawning. Dropping the
    /// returned handle also stops the task.
    pub fn spawn(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                ttl_ms = self.ttl.as_millis() as u64,
                interval_ms = self.interval.as_millis() as u64,
                "Expiry sweeper started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep_once(Instant::now());
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Expiry sweeper stopped");
        });

        SweeperHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper to stop and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Expiry sweeper task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
