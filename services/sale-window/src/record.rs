//! Retained sale event
//!
//! An [`EventRecord`] is a validated sale plus the moment it entered the
//! window. Expiry is driven only by the monotonic `arrived_at`; the
//! wall-clock `timestamp` exists for clients and is never compared.

use std::time::Duration;

use chrono::Utc;
use sale_types::ids::SaleId;
use sale_types::sale::Sale;
use serde::Serialize;
use tokio::time::Instant;

/// A sale event held by the sliding window.
///
/// Serialized as `{eventType, sale, timestamp}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Feed event tag the sale arrived under ("listed").
    pub event_type: String,
    /// The sale as received.
    pub sale: Sale,
    /// Arrival wall-clock time, Unix milliseconds.
    pub timestamp: i64,
    /// Monotonic arrival time, used solely for expiry.
    #[serde(skip)]
    pub arrived_at: Instant,
}

impl EventRecord {
    pub fn new(event_type: impl Into<String>, sale: Sale, arrived_at: Instant) -> Self {
        Self {
            event_type: event_type.into(),
            sale,
            timestamp: Utc::now().timestamp_millis(),
            arrived_at,
        }
    }

    pub fn id(&self) -> &SaleId {
        &self.sale.sale_id
    }

    /// Time spent in the window as of `now`.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.arrived_at)
    }

    /// Strictly older than `ttl`. A record exactly `ttl` old is still live.
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        self.age(now) > ttl
    }
}
