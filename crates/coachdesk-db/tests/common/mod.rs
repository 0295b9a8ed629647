//! Store doubles for repository tests

use async_trait::async_trait;
use coachdesk_store::{
    Document, DocumentStore, Fields, MemoryStore, StoreBackend, StoreError, StoreResult,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Memory store that can be switched into an outage.
///
/// While failing, every operation returns `StoreError::Unavailable`, the way a
/// lost connection to the document database would. `set_failing_writes` only
/// breaks `set_document`, leaving array operations working.
#[derive(Clone, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: Arc<AtomicBool>,
    failing_writes: Arc<AtomicBool>,
    reads: Arc<AtomicUsize>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_failing_writes(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }

    /// Point reads served so far, including failed ones.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn check(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset by peer".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn get_document(&self, path: &str) -> StoreResult<Option<Document>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.get_document(path).await
    }

    async fn set_document(&self, path: &str, fields: Fields, merge: bool) -> StoreResult<()> {
        self.check()?;
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write quota exceeded".to_string()));
        }
        self.inner.set_document(path, fields, merge).await
    }

    async fn create_document(&self, path: &str, fields: Fields) -> StoreResult<bool> {
        self.check()?;
        self.inner.create_document(path, fields).await
    }

    async fn delete_document(&self, path: &str) -> StoreResult<()> {
        self.check()?;
        self.inner.delete_document(path).await
    }

    async fn list_collection(&self, path: &str) -> StoreResult<Vec<Document>> {
        self.check()?;
        self.inner.list_collection(path).await
    }

    async fn array_union(&self, path: &str, field: &str, values: Vec<Value>) -> StoreResult<()> {
        self.check()?;
        self.inner.array_union(path, field, values).await
    }

    async fn array_remove(&self, path: &str, field: &str, values: Vec<Value>) -> StoreResult<()> {
        self.check()?;
        self.inner.array_remove(path, field, values).await
    }

    fn backend_type(&self) -> StoreBackend {
        StoreBackend::Memory
    }
}

/// Memory store that holds one read of `gated_path` open after fetching it.
///
/// The first read of the gated document returns the value it saw only once
/// `release` is called, so a test can change the store while a caller is
/// working from that stale value. Later reads pass straight through.
#[derive(Clone)]
pub struct GatedStore {
    inner: MemoryStore,
    gated_path: String,
    armed: Arc<AtomicBool>,
    reached: Arc<Notify>,
    released: Arc<Notify>,
}

impl GatedStore {
    pub fn new(gated_path: &str) -> Self {
        Self {
            inner: MemoryStore::new(),
            gated_path: gated_path.to_string(),
            armed: Arc::new(AtomicBool::new(true)),
            reached: Arc::new(Notify::new()),
            released: Arc::new(Notify::new()),
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Wait until a reader is parked on the gated document.
    pub async fn reached(&self) {
        self.reached.notified().await;
    }

    pub fn release(&self) {
        self.released.notify_one();
    }
}

#[async_trait]
impl DocumentStore for GatedStore {
    async fn get_document(&self, path: &str) -> StoreResult<Option<Document>> {
        let document = self.inner.get_document(path).await?;
        if path == self.gated_path && self.armed.swap(false, Ordering::SeqCst) {
            self.reached.notify_one();
            self.released.notified().await;
        }
        Ok(document)
    }

    async fn set_document(&self, path: &str, fields: Fields, merge: bool) -> StoreResult<()> {
        self.inner.set_document(path, fields, merge).await
    }

    async fn create_document(&self, path: &str, fields: Fields) -> StoreResult<bool> {
        self.inner.create_document(path, fields).await
    }

    async fn delete_document(&self, path: &str) -> StoreResult<()> {
        self.inner.delete_document(path).await
    }

    async fn list_collection(&self, path: &str) -> StoreResult<Vec<Document>> {
        self.inner.list_collection(path).await
    }

    async fn array_union(&self, path: &str, field: &str, values: Vec<Value>) -> StoreResult<()> {
        self.inner.array_union(path, field, values).await
    }

    async fn array_remove(&self, path: &str, field: &str, values: Vec<Value>) -> StoreResult<()> {
        self.inner.array_remove(path, field, values).await
    }

    fn backend_type(&self) -> StoreBackend {
        StoreBackend::Memory
    }
}

pub async fn seed(store: &MemoryStore, path: &str, fields: Value) {
    store
        .set_document(path, fields.as_object().cloned().unwrap_or_default(), false)
        .await
        .unwrap();
}
