//! vmsync core - VM inventory reconciliation engine
//!
//! Pulls the live virtual machine inventory from one or more cloud
//! subscriptions, normalizes it into canonical server records and reconciles
//! it with an operator-maintained spreadsheet. The implementation prioritizes:
//!
//! 1. **Partial failure** - one bad subscription never hides the others
//! 2. **Logging** - Every decision point logged with run context
//! 3. **Determinism** - unchanged inputs reconcile to an identical set
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `source` - Credentials, Resource Manager client and the connector
//! - `extraction` - Tag lookup and instance normalization
//! - `routing` - Power status and environment decisions
//! - `ingest` - Spreadsheet parsing and export
//! - `pipeline` - Reconciliation and the sync operations
//! - `storage` - Row models, SQL builders and the store trait
//! - `record` - Canonical server record and status vocabulary
//! - `config` - Environment-driven configuration
//! - `logging` - Structured logging with run context

pub mod config;
pub mod error;
pub mod extraction;
pub mod ingest;
pub mod logging;
pub mod pipeline;
pub mod record;
pub mod routing;
pub mod source;
pub mod storage;

#[cfg(feature = "python")]
mod python;

pub use error::{InventoryError, Result};

/// Initialize the module-level logger
pub fn init_logger() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_millis()
        .try_init();
}
