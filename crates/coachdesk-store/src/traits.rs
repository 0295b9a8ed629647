//! Document store abstraction trait
//!
//! This module defines the `DocumentStore` trait that every backend implements.
//! It is the seam to the document database: point reads, collection reads,
//! whole-document writes, create-if-absent, and atomic array-union /
//! array-remove on a field.

use crate::StoreBackend;
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Field map of a single document.
pub type Fields = Map<String, Value>;

/// A document read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Last path segment.
    pub id: String,
    /// Full slash-separated path.
    pub path: String,
    pub fields: Fields,
}

impl Document {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }
}

/// Store operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid document path: {0}")]
    InvalidPath(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Document store abstraction trait
///
/// Paths are slash-separated. Document paths have an even number of segments
/// (`roles/admins`, `tenants/acme/clients/u1`), collection paths an odd number
/// (`tenants`, `tenants/acme/clients`).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point read. `Ok(None)` when the document does not exist.
    async fn get_document(&self, path: &str) -> StoreResult<Option<Document>>;

    /// Write a document. With `merge`, top-level fields are overwritten and
    /// all other existing fields kept; without it the document is replaced.
    async fn set_document(&self, path: &str, fields: Fields, merge: bool) -> StoreResult<()>;

    /// Write a document only if it does not exist yet, as one atomic step.
    ///
    /// Returns `false`, leaving the stored document untouched, when the path is
    /// already taken.
    async fn create_document(&self, path: &str, fields: Fields) -> StoreResult<bool>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete_document(&self, path: &str) -> StoreResult<()>;

    /// Direct child documents of a collection, ordered by id.
    /// A collection with no documents is empty, not an error.
    async fn list_collection(&self, path: &str) -> StoreResult<Vec<Document>>;

    /// Atomically add each value to the array field unless already present.
    ///
    /// Creates the document (and the field) when missing. A non-array field is
    /// replaced by an array of the given values. Concurrent unions never lose
    /// each other's values.
    async fn array_union(&self, path: &str, field: &str, values: Vec<Value>) -> StoreResult<()>;

    /// Atomically remove every occurrence of each value from the array field.
    ///
    /// A missing document is left missing.
    async fn array_remove(&self, path: &str, field: &str, values: Vec<Value>) -> StoreResult<()>;

    /// Get the store backend type
    fn backend_type(&self) -> StoreBackend;
}
