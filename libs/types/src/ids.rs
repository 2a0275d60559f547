//! Identifier types for sale feed entities
//!
//! The upstream marketplace hands out opaque sale identifiers. Most are
//! integers, but nothing guarantees it, so both shapes are carried and
//! serialized back exactly as they arrived.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a marketplace sale
///
/// Opaque token from upstream. Equality is by shape and value: the
/// integer `7` and the string `"7"` are different identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SaleId {
    Numeric(u64),
    Text(String),
}

impl SaleId {
    /// Whether the identifier carries a usable value.
    ///
    /// Blank text tokens cannot identify a sale.
    pub fn is_valid(&self) -> bool {
        match self {
            SaleId::Numeric(_) => true,
            SaleId::Text(s) => !s.trim().is_empty(),
        }
    }
}

impl fmt::Display for SaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaleId::Numeric(n) => write!(f, "{}", n),
            SaleId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<u64> for SaleId {
    fn from(n: u64) -> Self {
        SaleId::Numeric(n)
    }
}

impl From<&str> for SaleId {
    fn from(s: &str) -> Self {
        SaleId::Text(s.to_string())
    }
}
