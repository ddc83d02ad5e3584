//! Classification rule chains.
//!
//! Derives the human-facing fields of a cloud record:
//! - Power status from the runtime status view
//! - Environment from tags, subscription id or instance name

pub mod environment;
pub mod power;

pub use environment::*;
pub use power::*;
