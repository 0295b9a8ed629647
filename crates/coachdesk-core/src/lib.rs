//! Coachdesk Core Library
//!
//! This crate provides the domain models, error types, configuration, and the
//! tenant-scoped path accessor shared across all coachdesk components.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod store_types;
pub mod tenant_context;
pub mod tenant_path;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use store_types::StoreBackend;
pub use tenant_context::{SessionTenant, TenantContextInfo};
pub use tenant_path::{
    platform_collection, platform_document, resolve_collection, resolve_document,
    resolve_subcollection, TenantId, TenantScope, TenantScopedPath,
};
