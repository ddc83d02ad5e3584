//! Pipeline orchestration module.
//!
//! One sync pass coordinates:
//! - Cloud enumeration (partial-failure tolerant)
//! - Normalization
//! - Reconciliation against the spreadsheet
//! - Replace-all persistence

pub mod context;
pub mod reconcile;
pub mod sync;

pub use context::*;
pub use reconcile::*;
pub use sync::*;
