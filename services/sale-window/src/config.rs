//! Window engine configuration
//!
//! Defaults mirror the live deployment: sales live for ten seconds and
//! the sweeper runs every two. Keeping the interval shorter than the TTL
//! bounds how long a sale can outlive its nominal expiry.

use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;

/// Default time-to-live of a retained sale, in milliseconds.
pub const ITEM_EXPIRY_MS: u64 = 10_000;

/// Default sweep period, in milliseconds.
pub const CLEANUP_INTERVAL_MS: u64 = 2_000;

/// Feed event type carrying new listings. Every other type is ignored.
pub const LISTED_EVENT_TYPE: &str = "listed";

/// Cosmetic and non-weapon categories that are never retained.
pub const DEFAULT_CATEGORY_DENY_LIST: &[&str] = &[
    "Container",
    "Sticker",
    "Graffiti",
    "Agent",
    "Charm",
    "Key",
    "Patch",
    "Collectible",
    "Pass",
    "Music Kit",
];

/// Configuration for the sliding window engine.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    /// How long a sale stays in the window after arrival.
    pub item_expiry: Duration,
    /// Period of the expiry sweeper.
    pub cleanup_interval: Duration,
    /// Categories dropped at ingestion (exact, case-sensitive).
    pub category_deny_list: Vec<String>,
    /// Event type that carries new listings.
    pub listing_event_type: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            item_expiry: Duration::from_millis(ITEM_EXPIRY_MS),
            cleanup_interval: Duration::from_millis(CLEANUP_INTERVAL_MS),
            category_deny_list: DEFAULT_CATEGORY_DENY_LIST
                .iter()
                .map(|c| c.to_string())
                .collect(),
            listing_event_type: LISTED_EVENT_TYPE.to_string(),
        }
    }
}

impl WindowConfig {
    /// Check the configuration before the engine starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.item_expiry.is_zero() {
            return Err(ConfigError::ZeroExpiry);
        }
        if self.cleanup_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.listing_event_type.trim().is_empty() {
            return Err(ConfigError::EmptyListingEventType);
        }
        if self.cleanup_interval >= self.item_expiry {
            warn!(
                item_expiry_ms = self.item_expiry.as_millis() as u64,
                cleanup_interval_ms = self.cleanup_interval.as_millis() as u64,
                "Cleanup interval is not shorter than item expiry; sales may outlive their TTL by a full interval"
            );
        }
        Ok(())
    }

    /// Whether sales of this category are excluded from the window.
    pub fn is_denied(&self, category: &str) -> bool {
        self.category_deny_list.iter().any(|denied| denied == category)
    }
}
