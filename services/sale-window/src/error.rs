//! Error types for the sale window engine

use sale_types::ids::SaleId;

/// Errors raised by the window store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("duplicate sale: {0} is already in the window")]
    DuplicateSale(SaleId),
}

/// Errors raised while validating window configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("item expiry must be greater than zero")]
    ZeroExpiry,

    #[error("cleanup interval must be greater than zero")]
    ZeroInterval,

    #[error("listing event type must not be empty")]
    EmptyListingEventType,
}
