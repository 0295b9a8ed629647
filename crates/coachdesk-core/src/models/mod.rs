//! Data models
//!
//! Documents persisted in the store (tenants, role rosters) and the values
//! derived from them (resolved user roles).

mod role;
mod tenant;

pub use role::*;
pub use tenant::*;
