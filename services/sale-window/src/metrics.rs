//! Observability and metrics for the sale window
//!
//! Counters for every way a sale can enter, be refused by, or leave the
//! window, plus query latency samples. Exported as a flat map for the
//! gateway's health endpoint.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::ingestion::BatchReport;

/// Core metrics for the window engine.
pub struct WindowMetrics {
    // Ingestion
    pub batches_received: AtomicU64,
    pub batches_ignored: AtomicU64,
    pub sales_accepted: AtomicU64,
    pub sales_duplicate: AtomicU64,
    pub sales_denied: AtomicU64,
    pub sales_malformed: AtomicU64,

    // Expiry
    pub sweeps_run: AtomicU64,
    pub records_evicted: AtomicU64,

    // Queries
    pub queries_served: AtomicU64,
    pub query_latency_ns: Mutex<LatencyTracker>,
}

impl WindowMetrics {
    pub fn new() -> Self {
        Self {
            batches_received: AtomicU64::new(0),
            batches_ignored: AtomicU64::new(0),
            sales_accepted: AtomicU64::new(0),
            sales_duplicate: AtomicU64::new(0),
            sales_denied: AtomicU64::new(0),
            sales_malformed: AtomicU64::new(0),
            sweeps_run: AtomicU64::new(0),
            records_evicted: AtomicU64::new(0),
            queries_served: AtomicU64::new(0),
            query_latency_ns: Mutex::new(LatencyTracker::new(1000)),
        }
    }

    /// Record a processed listing batch.
    pub fn record_batch(&self, report: &BatchReport) {
        self.batches_received.fetch_add(1, Ordering::Relaxed);
        self.sales_accepted.fetch_add(report.accepted as u64, Ordering::Relaxed);
        self.sales_duplicate.fetch_add(report.duplicates as u64, Ordering::Relaxed);
        self.sales_denied.fetch_add(report.denied as u64, Ordering::Relaxed);
        self.sales_malformed.fetch_add(report.malformed as u64, Ordering::Relaxed);
    }

    /// Record a batch discarded for its event type.
    pub fn record_ignored_batch(&self) {
        self.batches_received.fetch_add(1, Ordering::Relaxed);
        self.batches_ignored.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one sweep pass.
    pub fn record_sweep(&self, evicted: usize) {
        self.sweeps_run.fetch_add(1, Ordering::Relaxed);
        self.records_evicted.fetch_add(evicted as u64, Ordering::Relaxed);
    }

    /// Record a served query.
    pub fn record_query(&self, latency_ns: u64) {
        self.queries_served.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut tracker) = self.query_latency_ns.lock() {
            tracker.record(latency_ns);
        }
    }

    /// Export metrics as a BTreeMap for Prometheus-style exposition.
    pub fn export(&self) -> BTreeMap<String, u64> {
        let mut m = BTreeMap::new();
        m.insert("batches_received".to_string(), self.batches_received.load(Ordering::Relaxed));
        m.insert("batches_ignored".to_string(), self.batches_ignored.load(Ordering::Relaxed));
        m.insert("sales_accepted".to_string(), self.sales_accepted.load(Ordering::Relaxed));
        m.insert("sales_duplicate".to_string(), self.sales_duplicate.load(Ordering::Relaxed));
        m.insert("sales_denied".to_string(), self.sales_denied.load(Ordering::Relaxed));
        m.insert("sales_malformed".to_string(), self.sales_malformed.load(Ordering::Relaxed));
        m.insert("sweeps_run".to_string(), self.sweeps_run.load(Ordering::Relaxed));
        m.insert("records_evicted".to_string(), self.records_evicted.load(Ordering::Relaxed));
        m.insert("queries_served".to_string(), self.queries_served.load(Ordering::Relaxed));
        if let Ok(tracker) = self.query_latency_ns.lock() {
            if let Some(p50) = tracker.percentile(50) {
                m.insert("query_latency_p50_ns".to_string(), p50);
            }
            if let Some(p99) = tracker.percentile(99) {
                m.insert("query_latency_p99_ns".to_string(), p99);
            }
        }
        m
    }
}

impl Default for WindowMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks latency samples for percentile calculation.
pub struct LatencyTracker {
    samples: Vec<u64>,
    max_samples: usize,
}

impl LatencyTracker {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: Vec::with_capacity(max_samples),
            max_samples,
        }
    }

    /// Record a latency sample, dropping the oldest when full.
    pub fn record(&mut self, value: u64) {
        if self.samples.len() >= self.max_samples {
            self.samples.remove(0);
        }
        self.samples.push(value);
    }

    /// Get a percentile value (0-100).
    pub fn percentile(&self, p: usize) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }

        let mut sorted = self.samples.clone();
        sorted.sort_unstable();

        let idx = (p as f64 / 100.0 * (sorted.len() - 1) as f64) as usize;
        Some(sorted[idx.min(sorted.len() - 1)])
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }
}
