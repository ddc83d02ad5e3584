//! Field extraction module.
//!
//! Turns raw control-plane instances into canonical records:
//! - `tags` - ordered tag alias lookup
//! - `normalize` - instance + status view → `ServerRecord`

pub mod normalize;
pub mod tags;

pub use normalize::*;
pub use tags::*;
