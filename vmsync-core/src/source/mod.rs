//! Source connector module.
//!
//! Walks subscriptions → resource groups → instances on the cloud control
//! plane and returns raw instance records with their runtime status:
//! - `client` - control-plane client trait and raw payload types
//! - `credential` - bearer-token credentials
//! - `arm` - Azure Resource Manager REST implementation of the client
//! - `connector` - partial-failure-tolerant enumeration

pub mod arm;
pub mod client;
pub mod connector;
pub mod credential;

pub use arm::*;
pub use client::*;
pub use connector::*;
pub use credential::*;
