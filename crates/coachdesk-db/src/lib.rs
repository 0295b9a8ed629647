//! Coachdesk DB Library
//!
//! Repositories over the document store: role rosters, tenants, the
//! access-control service built on top of rosters, and tenant detection for
//! signed-in users.
//
// Role rosters and the role-check predicate
pub mod roles;
//
// Role hierarchy, cached resolution, privileged role changes
pub mod access;
pub mod cache;
//
// Tenant documents and tenant detection
pub mod locator;
pub mod tenants;
//
// Store error conversion
mod error;

pub use access::AccessControl;
pub use cache::RoleCache;
pub use locator::TenantLocator;
pub use roles::RoleRepository;
pub use tenants::TenantRepository;
