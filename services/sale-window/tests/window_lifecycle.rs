//! Lifecycle tests for the sale window
//!
//! Drives the engine the way the gateway does (ingest, sweep, query)
//! and checks the externally visible guarantees:
//! - End-to-end listing scenario
//! - Dedup across batches
//! - Expiry bounds relative to TTL and sweep interval
//! - Arrival order preserved through queries

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use sale_types::ids::SaleId;
use sale_window::config::WindowConfig;
use sale_window::ingestion::{IngestionResult, SaleIngester};
use sale_window::metrics::WindowMetrics;
use sale_window::query::{QueryEngine, QueryParams};
use sale_window::sweeper::ExpirySweeper;
use sale_window::window::SharedWindow;
use sale_window::WindowService;
use serde_json::{json, Value};
use tokio::time::Instant;

struct Harness {
    window: SharedWindow,
    ingester: SaleIngester,
    engine: QueryEngine,
    sweeper: ExpirySweeper,
}

fn harness() -> Harness {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let config = WindowConfig::default();
    let window = SharedWindow::new();
    let metrics = Arc::new(WindowMetrics::new());
    Harness {
        ingester: SaleIngester::new(window.clone(), Arc::new(config.clone()), metrics.clone()),
        engine: QueryEngine::new(window.clone(), metrics.clone()),
        sweeper: ExpirySweeper::new(window.clone(), &config, metrics),
        window,
    }
}

fn query(engine: &QueryEngine, value: Value) -> Vec<SaleId> {
    let params: QueryParams = serde_json::from_value(value).unwrap();
    engine
        .query(&params)
        .into_iter()
        .map(|r| r.sale.sale_id)
        .collect()
}

fn weapon(id: u64, category: &str, market_name: &str, wear: Option<f64>) -> Value {
    let mut sale = json!({
        "saleId": id,
        "category": category,
        "marketName": market_name,
    });
    if let Some(w) = wear {
        sale["wear"] = json!(w);
    }
    sale
}

#[test]
fn test_end_to_end_listing_scenario() {
    let h = harness();
    let t0 = Instant::now();

    h.ingester.ingest_at(
        "listed",
        vec![
            json!({"id": 1, "category": "Knife", "marketName": "Karambit | Tiger Tooth", "wear": 0.03}),
            json!({"id": 2, "category": "Sticker", "marketName": "Foo"}),
        ],
        t0,
    );

    let all: Vec<SaleId> = h.window.snapshot().into_iter().map(|r| r.sale.sale_id).collect();
    assert_eq!(all, vec![SaleId::Numeric(1)]);

    assert_eq!(query(&h.engine, json!({"marketName": "Karambit"})), vec![SaleId::Numeric(1)]);
    assert!(query(&h.engine, json!({"marketName": "AWP"})).is_empty());

    // Past the TTL, one sweep empties the window
    h.sweeper.sweep_once(t0 + Duration::from_millis(10_001));
    assert!(h.window.snapshot().is_empty());
}

#[test]
fn test_filter_composition_category_and_wear() {
    let h = harness();

    h.ingester.ingest(
        "listed",
        vec![
            weapon(1, "Knife", "Bayonet | Doppler", Some(0.01)),
            weapon(2, "knife", "Flip Knife | Fade", Some(0.7)),
            weapon(3, "Knife", "Gut Knife | Vanilla", None),
            weapon(4, "Rifle", "AK-47 | Redline", Some(0.1)),
        ],
    );

    assert_eq!(
        query(&h.engine, json!({"category": "Knife", "wear": "0.5"})),
        vec![SaleId::Numeric(1)]
    );
    assert_eq!(
        query(&h.engine, json!({"category": "Knife"})),
        vec![SaleId::Numeric(1), SaleId::Numeric(2), SaleId::Numeric(3)]
    );
}

#[test]
fn test_malformed_query_returns_fewer_results() {
    let h = harness();
    h.ingester.ingest(
        "listed",
        vec![
            weapon(1, "Knife", "Bayonet", Some(0.01)),
            weapon(2, "Rifle", "M4A1-S", Some(0.2)),
        ],
    );

    assert!(query(&h.engine, json!({"wear": "abc"})).is_empty());
    assert!(query(&h.engine, json!({"pattern": "1,two"})).is_empty());
    assert_eq!(query(&h.engine, json!({})).len(), 2);
}

#[test]
fn test_listing_with_mistyped_exterior_is_kept() {
    let h = harness();
    h.ingester.ingest(
        "listed",
        vec![json!({"saleId": 11, "category": "Knife", "marketName": "Ursus Knife", "exterior": 5})],
    );

    assert_eq!(h.window.len(), 1);
    assert_eq!(query(&h.engine, json!({"category": "Knife"})), vec![SaleId::Numeric(11)]);
    assert!(query(&h.engine, json!({"exterior": "5"})).is_empty());
}

#[test]
fn test_same_id_twice_retained_once() {
    let h = harness();

    h.ingester.ingest("listed", vec![weapon(42, "Pistol", "Glock-18 | Fade", Some(0.02))]);
    let second = h
        .ingester
        .ingest("listed", vec![weapon(42, "Pistol", "Glock-18 | Fade", Some(0.02))]);

    match second {
        IngestionResult::Processed(report) => {
            assert_eq!(report.accepted, 0);
            assert_eq!(report.duplicates, 1);
        }
        other => panic!("Expected Processed, got {:?}", other),
    }
    assert_eq!(h.window.len(), 1);
}

#[test]
fn test_expired_id_can_return() {
    let h = harness();
    let t0 = Instant::now();

    h.ingester.ingest_at("listed", vec![weapon(1, "Knife", "Talon", None)], t0);
    h.sweeper.sweep_once(t0 + Duration::from_secs(11));
    assert!(h.window.is_empty());

    h.ingester
        .ingest_at("listed", vec![weapon(1, "Knife", "Talon", None)], t0 + Duration::from_secs(11));
    assert_eq!(h.window.len(), 1);
}

#[test]
fn test_delisted_events_leave_window_untouched() {
    let h = harness();
    h.ingester.ingest("listed", vec![weapon(1, "Knife", "Talon", None)]);

    let result = h.ingester.ingest("delisted", vec![weapon(1, "Knife", "Talon", None)]);
    assert_eq!(result, IngestionResult::Ignored);
    assert_eq!(h.window.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_expiry_bounded_by_ttl_plus_interval() {
    let service = WindowService::start(WindowConfig::default()).unwrap();
    let ingester = service.ingester();
    let engine = service.query_engine();

    // Arrive half-way through a sweep period
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    ingester.ingest("listed", vec![weapon(1, "Knife", "Navaja", Some(0.4))]);

    // Present for every query up to TTL after arrival
    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(engine.query(&QueryParams::default()).len(), 1);
    }

    // Absent once TTL + interval has elapsed
    tokio::time::sleep(Duration::from_millis(2_001)).await;
    assert!(engine.query(&QueryParams::default()).is_empty());

    service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_staggered_arrivals_expire_in_order() {
    let service = WindowService::start(WindowConfig::default()).unwrap();
    let ingester = service.ingester();

    for id in 1..=5u64 {
        ingester.ingest("listed", vec![weapon(id, "SMG", "MP9 | Hydra", None)]);
        tokio::time::sleep(Duration::from_millis(3_000)).await;
    }
    // Now at t=15s: ids arrived at 0,3,6,9,12. The sweep at t=14s
    // evicted everything older than 10s.
    let remaining: Vec<SaleId> = service
        .window()
        .snapshot()
        .into_iter()
        .map(|r| r.sale.sale_id)
        .collect();
    assert_eq!(
        remaining,
        vec![SaleId::Numeric(3), SaleId::Numeric(4), SaleId::Numeric(5)]
    );
    assert!(service.window().with(|w| w.is_consistent()));

    service.shutdown().await;
}

// ── Property-Based Tests ────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_snapshot_preserves_ingest_order(ids in proptest::collection::vec(0u64..50, 1..60)) {
        let h = harness();
        for id in &ids {
            h.ingester.ingest("listed", vec![weapon(*id, "Rifle", "AWP | Asiimov", None)]);
        }

        // Expected: first occurrence of each id, in ingest order
        let mut expected = Vec::new();
        for id in &ids {
            let id = SaleId::Numeric(*id);
            if !expected.contains(&id) {
                expected.push(id);
            }
        }

        let actual: Vec<SaleId> = h.window.snapshot().into_iter().map(|r| r.sale.sale_id).collect();
        prop_assert_eq!(actual, expected);
        prop_assert!(h.window.with(|w| w.is_consistent()));
    }

    #[test]
    fn prop_denied_categories_never_retained(
        denied_idx in 0usize..10,
        id in 0u64..1000,
        wear in 0.0f64..1.0,
    ) {
        let h = harness();
        let category = WindowConfig::default().category_deny_list[denied_idx].clone();
        h.ingester.ingest("listed", vec![weapon(id, &category, "Anything", Some(wear))]);
        prop_assert!(h.window.is_empty());
    }

    #[test]
    fn prop_eviction_keeps_index_in_sync(
        offsets in proptest::collection::vec(0u64..20_000, 1..40),
        sweep_at in 0u64..40_000,
    ) {
        let h = harness();
        let t0 = Instant::now();
        let mut sorted = offsets.clone();
        sorted.sort_unstable();

        for (i, offset) in sorted.iter().enumerate() {
            h.ingester.ingest_at(
                "listed",
                vec![weapon(i as u64, "Pistol", "USP-S | Kill Confirmed", None)],
                t0 + Duration::from_millis(*offset),
            );
        }

        let now = t0 + Duration::from_millis(sweep_at);
        h.sweeper.sweep_once(now);

        prop_assert!(h.window.with(|w| w.is_consistent()));
        let ttl = Duration::from_millis(10_000);
        for record in h.window.snapshot() {
            prop_assert!(now.saturating_duration_since(record.arrived_at) <= ttl);
        }
    }
}
