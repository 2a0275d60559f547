//! Inbound feed events
//!
//! The transport delivers `saleFeed` pushes shaped as
//! `{eventType, sales: [...]}`. Sales stay raw JSON here so that one
//! malformed sale cannot fail the decoding of its whole batch.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ingestion::IngestionResult;

/// One push from the upstream sale feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedBatch {
    /// "listed", "sold", ...
    pub event_type: String,
    #[serde(default)]
    pub sales: Vec<Value>,
}

impl FeedBatch {
    pub fn new(event_type: impl Into<String>, sales: Vec<Value>) -> Self {
        Self {
            event_type: event_type.into(),
            sales,
        }
    }
}

/// Callback registered with the feed transport.
///
/// Invoked once per batch; runs to completion before the transport reads
/// the next frame.
pub trait SaleFeedHandler: Send + Sync {
    fn on_batch(&self, batch: FeedBatch) -> IngestionResult;
}
