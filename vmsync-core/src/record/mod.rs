//! Canonical server record.
//!
//! Every source (cloud control plane, operations spreadsheet) is normalized
//! into `ServerRecord` before reconciliation.

pub mod server;
pub mod status;

pub use server::*;
pub use status::*;
