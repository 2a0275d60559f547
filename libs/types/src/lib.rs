//! Types library for the live sale feed
//!
//! Provides the value types shared by the sliding-window engine and the
//! gateway: sale identifiers, the upstream sale record, and the error
//! taxonomy for decoding it.
//!
//! # Modules
//! - `ids`: Sale identifiers (SaleId)
//! - `sale`: Upstream sale record with lenient numeric decoding
//! - `errors`: Error taxonomy

// Public modules
pub mod ids;
pub mod sale;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::sale::*;
    pub use crate::errors::*;
}
