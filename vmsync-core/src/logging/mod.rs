//! Structured logging with sync-run context.
//!
//! Provides logging macros and utilities that include the run id and the
//! subscription / resource group being walked in every log message.

pub mod structured;

pub use structured::*;
