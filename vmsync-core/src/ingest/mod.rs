//! Spreadsheet ingestion module.
//!
//! Reads and writes the semicolon-delimited operations spreadsheet:
//! - `spreadsheet` - parse rows into canonical records
//! - `export` - render records back into the same format

pub mod export;
pub mod spreadsheet;

pub use export::*;
pub use spreadsheet::*;
