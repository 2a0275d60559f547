//! Window service lifecycle
//!
//! Owns the shared window for the life of the process: built once at
//! start-up, handed out to the transport and the HTTP adapter as cloneable
//! handles, and torn down by cancelling the sweeper.

use std::sync::Arc;

use tracing::info;

use crate::config::WindowConfig;
use crate::error::ConfigError;
use crate::ingestion::SaleIngester;
use crate::metrics::WindowMetrics;
use crate::query::QueryEngine;
use crate::sweeper::{ExpirySweeper, SweeperHandle};
use crate::window::SharedWindow;

/// Running sale window with its sweeper.
pub struct WindowService {
    window: SharedWindow,
    config: Arc<WindowConfig>,
    metrics: Arc<WindowMetrics>,
    sweeper: SweeperHandle,
}

impl WindowService {
    /// Validate the configuration and start the expiry sweeper.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(config: WindowConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let window = SharedWindow::new();
        let metrics = Arc::new(WindowMetrics::new());
        let sweeper = ExpirySweeper::new(window.clone(), &config, metrics.clone()).spawn();

        info!(
            item_expiry_ms = config.item_expiry.as_millis() as u64,
            cleanup_interval_ms = config.cleanup_interval.as_millis() as u64,
            denied_categories = config.category_deny_list.len(),
            "Window service started"
        );

        Ok(Self {
            window,
            config: Arc::new(config),
            metrics,
            sweeper,
        })
    }

    pub fn ingester(&self) -> SaleIngester {
        SaleIngester::new(self.window.clone(), self.config.clone(), self.metrics.clone())
    }

    pub fn query_engine(&self) -> QueryEngine {
        QueryEngine::new(self.window.clone(), self.metrics.clone())
    }

    pub fn window(&self) -> &SharedWindow {
        &self.window
    }

    pub fn metrics(&self) -> Arc<WindowMetrics> {
        self.metrics.clone()
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Stop the sweeper. The window is dropped with the last handle.
    pub async fn shutdown(self) {
        self.sweeper.shutdown().await;
        info!(window_size = self.window.len(), "Window service stopped");
    }
}
