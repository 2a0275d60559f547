//! Sale ingestion pipeline
//!
//! Turns feed batches into window records:
//! 1. batches whose event type is not the listing type are discarded whole
//! 2. each sale is decoded; malformed ones are dropped on their own
//! 3. deny-listed categories are dropped
//! 4. ids already retained are dropped as duplicates
//! 5. survivors are stamped with the arrival time and appended
//!
//! Steps 4 and 5 run for the whole batch under one window lock.

use std::sync::Arc;

use sale_types::sale::Sale;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::WindowConfig;
use crate::events::{FeedBatch, SaleFeedHandler};
use crate::metrics::WindowMetrics;
use crate::record::EventRecord;
use crate::window::SharedWindow;

/// Per-batch ingestion counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Sales appended to the window.
    pub accepted: usize,
    /// Sales whose id was already retained.
    pub duplicates: usize,
    /// Sales in a deny-listed category.
    pub denied: usize,
    /// Sales that failed to decode.
    pub malformed: usize,
}

/// Result of ingesting one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestionResult {
    /// Event type carries no listings; nothing was looked at.
    Ignored,
    /// Batch processed sale by sale.
    Processed(BatchReport),
}

/// Write side of the engine.
#[derive(Clone)]
pub struct SaleIngester {
    window: SharedWindow,
    config: Arc<WindowConfig>,
    metrics: Arc<WindowMetrics>,
}

impl SaleIngester {
    pub fn new(window: SharedWindow, config: Arc<WindowConfig>, metrics: Arc<WindowMetrics>) -> Self {
        Self {
            window,
            config,
            metrics,
        }
    }

    /// Ingest a batch, stamping accepted sales with the current time.
    pub fn ingest(&self, event_type: &str, sales: Vec<Value>) -> IngestionResult {
        self.ingest_at(event_type, sales, Instant::now())
    }

    /// Ingest a batch with an explicit arrival time.
    pub fn ingest_at(&self, event_type: &str, sales: Vec<Value>, now: Instant) -> IngestionResult {
        if event_type != self.config.listing_event_type {
            self.metrics.record_ignored_batch();
            debug!(event_type, sales = sales.len(), "Ignoring non-listing batch");
            return IngestionResult::Ignored;
        }

        let mut report = BatchReport::default();
        let mut fresh = Vec::with_capacity(sales.len());

        for raw in sales {
            let sale = match Sale::from_value(raw) {
                Ok(sale) => sale,
                Err(e) => {
                    warn!(error = %e, "Dropping malformed sale");
                    report.malformed += 1;
                    continue;
                }
            };

            if self.config.is_denied(&sale.category) {
                debug!(
                    sale_id = %sale.sale_id,
                    category = %sale.category,
                    "Dropping deny-listed sale"
                );
                report.denied += 1;
                continue;
            }

            debug!(
                sale_id = %sale.sale_id,
                market_name = %sale.market_name,
                "New sale"
            );
            fresh.push(EventRecord::new(event_type, sale, now));
        }

        let outcome = self.window.append_batch(fresh);
        report.accepted = outcome.accepted;
        report.duplicates = outcome.duplicates;

        self.metrics.record_batch(&report);
        info!(
            accepted = report.accepted,
            duplicates = report.duplicates,
            denied = report.denied,
            malformed = report.malformed,
            window_size = outcome.window_len,
            "Sale batch ingested"
        );

        IngestionResult::Processed(report)
    }
}

impl SaleFeedHandler for SaleIngester {
    fn on_batch(&self, batch: FeedBatch) -> IngestionResult {
        self.ingest(&batch.event_type, batch.sales)
    }
}
