//! Sale Window Service
//!
//! Retains a bounded, time-limited window of live marketplace listings and
//! answers ad-hoc filter queries against it:
//! - Category prefilter (cosmetic items are never retained)
//! - Deduplication of redelivered sales
//! - TTL expiry driven by a periodic sweeper
//! - Multi-field, order-preserving queries
//!
//! # Architecture
//!
//! ```text
//!  saleFeed batches
//!        │
//!    ┌───▼────┐
//!    │Ingest  │  ← event type, category, dedup
//!    └───┬────┘
//!        │ append (tail)
//!   ┌────▼─────────────┐   evict (head)  ┌────────┐
//!   │ SharedWindow     │◄────────────────┤Sweeper │
//!   │ records + index  │                 └────────┘
//!   └────┬─────────────┘
//!        │ scan
//!    ┌───▼────┐
//!    │ Query  │  → matching records, oldest first
//!    └────────┘
//! ```

pub mod config;
pub mod dedup;
pub mod error;
pub mod events;
pub mod ingestion;
pub mod metrics;
pub mod query;
pub mod record;
pub mod service;
pub mod sweeper;
pub mod window;

pub use config::WindowConfig;
pub use events::{FeedBatch, SaleFeedHandler};
pub use ingestion::{BatchReport, IngestionResult, SaleIngester};
pub use query::{QueryEngine, QueryFilter, QueryParams};
pub use record::EventRecord;
pub use service::WindowService;
pub use window::{SaleWindow, SharedWindow};

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
