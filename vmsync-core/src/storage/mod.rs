//! Storage module.
//!
//! Persistence boundary for the reconciled set: flat row models, SQL
//! builders for the `servers` table and the `ServerStore` trait.
//! Actual database execution is owned by the hosting service.

pub mod models;
pub mod queries;
pub mod store;

pub use models::*;
pub use queries::*;
pub use store::*;
