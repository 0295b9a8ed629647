//! Coachdesk Store Library
//!
//! This crate provides the document store abstraction and its backends.
//! It includes the `DocumentStore` trait, an in-memory backend, and a local
//! filesystem backend that keeps one JSON file per document.
//!
//! # Path format
//!
//! Paths are slash-separated and alternate collection and document ids:
//!
//! - **Collections**: `tenants`, `tenants/{tenant_id}/clients`
//! - **Documents**: `roles/admins`, `tenants/{tenant_id}/roles/coaches`
//!
//! Segments must not be empty, `.` or `..`, and paths must not start or end
//! with `/`. Validation lives in the `paths` module so all backends agree.

pub mod factory;
pub(crate) mod fields;
#[cfg(feature = "store-local")]
pub mod local;
pub mod memory;
pub mod paths;
pub mod traits;

// Re-export commonly used types
pub use coachdesk_core::StoreBackend;
pub use factory::create_store;
#[cfg(feature = "store-local")]
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use traits::{Document, DocumentStore, Fields, StoreError, StoreResult};
