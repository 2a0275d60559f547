//! Sliding window store
//!
//! Holds retained sales in arrival order together with the dedup index.
//! Records are appended at the tail and evicted only from the head, so the
//! sequence stays sorted by `arrived_at` and an expiry pass touches exactly
//! the records that have expired.
//!
//! Invariants:
//! - `records` is ordered by non-decreasing `arrived_at`
//! - an id is in `records` iff it is in `index`
//! - no two records share an id

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sale_types::ids::SaleId;
use tokio::time::Instant;
use tracing::debug;

use crate::dedup::DedupIndex;
use crate::error::WindowError;
use crate::query::QueryFilter;
use crate::record::EventRecord;

/// Outcome of appending a batch under a single lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Records added to the window.
    pub accepted: usize,
    /// Records skipped because their id was already retained.
    pub duplicates: usize,
    /// Window size after the batch.
    pub window_len: usize,
}

/// Ordered store of retained sales plus their dedup index.
#[derive(Debug, Default)]
pub struct SaleWindow {
    records: VecDeque<EventRecord>,
    index: DedupIndex,
}

impl SaleWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record at the tail.
    ///
    /// Refuses ids already retained. An arrival time earlier than the
    /// current tail is clamped to the tail's so ordering is preserved.
    pub fn append(&mut self, mut record: EventRecord) -> Result<(), WindowError> {
        if self.index.contains(record.id()) {
            return Err(WindowError::DuplicateSale(record.id().clone()));
        }

        if let Some(tail) = self.records.back() {
            if record.arrived_at < tail.arrived_at {
                record.arrived_at = tail.arrived_at;
            }
        }

        self.index.add(record.id().clone());
        self.records.push_back(record);
        Ok(())
    }

    /// Append each record whose id is not yet retained.
    ///
    /// Duplicates inside the batch itself are caught as well.
    pub fn append_batch(&mut self, records: Vec<EventRecord>) -> AppendOutcome {
        let mut outcome = AppendOutcome::default();

        for record in records {
            match self.append(record) {
                Ok(()) => outcome.accepted += 1,
                Err(WindowError::DuplicateSale(id)) => {
                    debug!(sale_id = %id, "Dropping duplicate sale");
                    outcome.duplicates += 1;
                }
            }
        }

        outcome.window_len = self.records.len();
        outcome
    }

    /// Evict every head record older than `ttl` as of `now`.
    ///
    /// Stops at the first live head. Returns the ids evicted, oldest first.
    pub fn evict_expired(&mut self, now: Instant, ttl: Duration) -> Vec<SaleId> {
        let mut evicted = Vec::new();

        while self
            .records
            .front()
            .is_some_and(|head| head.is_expired(now, ttl))
        {
            if let Some(old) = self.records.pop_front() {
                self.index.remove(old.id());
                debug!(sale_id = %old.id(), "Evicted expired sale");
                evicted.push(old.sale.sale_id);
            }
        }

        evicted
    }

    /// Full window contents, oldest first.
    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.records.iter().cloned().collect()
    }

    /// Records matching the filter, oldest first.
    pub fn query(&self, filter: &QueryFilter) -> Vec<EventRecord> {
        self.records
            .iter()
            .filter(|record| filter.matches(&record.sale))
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventRecord> {
        self.records.iter()
    }

    pub fn contains(&self, id: &SaleId) -> bool {
        self.index.contains(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Arrival time of the oldest retained record.
    pub fn oldest_arrival(&self) -> Option<Instant> {
        self.records.front().map(|r| r.arrived_at)
    }

    /// Check the store invariants. Linear in window size.
    pub fn is_consistent(&self) -> bool {
        if self.records.len() != self.index.len() {
            return false;
        }
        let ordered = self
            .records
            .iter()
            .zip(self.records.iter().skip(1))
            .all(|(a, b)| a.arrived_at <= b.arrived_at);
        ordered && self.records.iter().all(|r| self.index.contains(r.id()))
    }
}

/// Cloneable handle to a window shared between ingestion, sweeping and
/// queries.
///
/// A single lock covers the records and the index, so no reader ever
/// observes an append or eviction halfway through.
#[derive(Debug, Clone, Default)]
pub struct SharedWindow {
    inner: Arc<Mutex<SaleWindow>>,
}

impl SharedWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, record: EventRecord) -> Result<(), WindowError> {
        self.inner.lock().append(record)
    }

    pub fn append_batch(&self, records: Vec<EventRecord>) -> AppendOutcome {
        self.inner.lock().append_batch(records)
    }

    pub fn evict_expired(&self, now: Instant, ttl: Duration) -> Vec<SaleId> {
        self.inner.lock().evict_expired(now, ttl)
    }

    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.inner.lock().snapshot()
    }

    pub fn query(&self, filter: &QueryFilter) -> Vec<EventRecord> {
        self.inner.lock().query(filter)
    }

    pub fn contains(&self, id: &SaleId) -> bool {
        self.inner.lock().contains(id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Run a read-only closure against the locked window.
    pub fn with<R>(&self, f: impl FnOnce(&SaleWindow) -> R) -> R {
        f(&self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryParams;
    use sale_types::sale::Sale;
    use serde_json::json;

    const TTL: Duration = Duration::from_millis(10_000);

    fn make_record(id: u64, arrived_at: Instant) -> EventRecord {
        let sale = Sale::from_value(json!({
            "saleId": id,
            "category": "Knife",
            "marketName": format!("Knife #{}", id),
        }))
        .unwrap();
        EventRecord::new("listed", sale, arrived_at)
    }

    fn ids(records: &[EventRecord]) -> Vec<SaleId> {
        records.iter().map(|r| r.id().clone()).collect()
    }

    #[test]
    fn test_append_preserves_order() {
        let t0 = Instant::now();
        let mut window = SaleWindow::new();

        for i in 1..=5 {
            window.append(make_record(i, t0 + Duration::from_millis(i))).unwrap();
        }

        assert_eq!(window.len(), 5);
        assert_eq!(
            ids(&window.snapshot()),
            (1..=5).map(SaleId::Numeric).collect::<Vec<_>>()
        );
        assert!(window.is_consistent());
    }

    #[test]
    fn test_append_rejects_duplicate() {
        let t0 = Instant::now();
        let mut window = SaleWindow::new();

        window.append(make_record(1, t0)).unwrap();
        let err = window.append(make_record(1, t0)).unwrap_err();

        assert_eq!(err, WindowError::DuplicateSale(SaleId::Numeric(1)));
        assert_eq!(window.len(), 1);
        assert!(window.is_consistent());
    }

    #[test]
    fn test_append_clamps_out_of_order_arrival() {
        let t0 = Instant::now();
        let mut window = SaleWindow::new();

        window.append(make_record(1, t0 + Duration::from_secs(5))).unwrap();
        window.append(make_record(2, t0)).unwrap();

        let snapshot = window.snapshot();
        assert_eq!(snapshot[1].arrived_at, t0 + Duration::from_secs(5));
        assert!(window.is_consistent());
    }

    #[test]
    fn test_append_batch_counts_duplicates() {
        let t0 = Instant::now();
        let mut window = SaleWindow::new();
        window.append(make_record(1, t0)).unwrap();

        let outcome = window.append_batch(vec![
            make_record(1, t0),
            make_record(2, t0),
            make_record(2, t0),
            make_record(3, t0),
        ]);

        assert_eq!(outcome.accepted, 2);
        assert_eq!(outcome.duplicates, 2);
        assert_eq!(outcome.window_len, 3);
    }

    #[test]
    fn test_evict_on_empty_is_noop() {
        let mut window = SaleWindow::new();
        let evicted = window.evict_expired(Instant::now(), TTL);
        assert!(evicted.is_empty());
        assert!(window.is_empty());
    }

    #[test]
    fn test_evict_stops_at_first_live_head() {
        let t0 = Instant::now();
        let mut window = SaleWindow::new();

        window.append(make_record(1, t0)).unwrap();
        window.append(make_record(2, t0 + Duration::from_millis(1_000))).unwrap();
        window.append(make_record(3, t0 + Duration::from_millis(5_000))).unwrap();

        // 10.5s after t0: only record 1 is older than the TTL
        let evicted = window.evict_expired(t0 + Duration::from_millis(10_500), TTL);
        assert_eq!(evicted, vec![SaleId::Numeric(1)]);
        assert_eq!(window.len(), 2);

        // 15.5s after t0: record 3 is exactly 10.5s old, record 2 is 14.5s
        let evicted = window.evict_expired(t0 + Duration::from_millis(15_500), TTL);
        assert_eq!(evicted, vec![SaleId::Numeric(2), SaleId::Numeric(3)]);
        assert!(window.is_empty());
        assert!(window.is_consistent());
    }

    #[test]
    fn test_record_at_exact_ttl_survives() {
        let t0 = Instant::now();
        let mut window = SaleWindow::new();
        window.append(make_record(1, t0)).unwrap();

        assert!(window.evict_expired(t0 + TTL, TTL).is_empty());
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_eviction_releases_dedup_entry() {
        let t0 = Instant::now();
        let mut window = SaleWindow::new();
        window.append(make_record(1, t0)).unwrap();

        window.evict_expired(t0 + TTL + Duration::from_millis(1), TTL);
        assert!(!window.contains(&SaleId::Numeric(1)));

        // Same id can be retained again once it has left the window
        let later = t0 + Duration::from_secs(20);
        assert!(window.append(make_record(1, later)).is_ok());
    }

    #[test]
    fn test_query_is_non_destructive() {
        let t0 = Instant::now();
        let mut window = SaleWindow::new();
        window.append(make_record(1, t0)).unwrap();
        window.append(make_record(2, t0)).unwrap();

        let filter = QueryFilter::compile(&QueryParams::default());
        assert_eq!(window.query(&filter).len(), 2);
        assert_eq!(window.query(&filter).len(), 2);
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn test_shared_window_concurrent_access() {
        let window = SharedWindow::new();
        let t0 = Instant::now();

        let writers: Vec<_> = (0..4u64)
            .map(|w| {
                let window = window.clone();
                std::thread::spawn(move || {
                    for i in 0..250u64 {
                        let _ = window.append(make_record(w * 1_000 + i, t0));
                    }
                })
            })
            .collect();

        let reader = {
            let window = window.clone();
            std::thread::spawn(move || {
                for _ in 0..100 {
                    assert!(window.with(|w| w.is_consistent()));
                }
            })
        };

        for handle in writers {
            handle.join().unwrap();
        }
        reader.join().unwrap();

        assert_eq!(window.len(), 1_000);
        assert!(window.with(|w| w.is_consistent()));
    }
}
