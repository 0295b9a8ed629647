use crate::fields::{apply_remove, apply_set, apply_union};
use crate::paths::{collection_segments, document_id, document_segments};
use crate::traits::{Document, DocumentStore, Fields, StoreResult};
use crate::StoreBackend;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-process document store
///
/// Every mutation runs under one write lock, which makes array-union and
/// array-remove atomic with respect to each other. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    documents: Arc<RwLock<BTreeMap<String, Fields>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents across all collections.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, path: &str) -> StoreResult<Option<Document>> {
        let id = document_id(path)?;
        let documents = self.documents.read().await;
        Ok(documents.get(path).map(|fields| Document {
            id,
            path: path.to_string(),
            fields: fields.clone(),
        }))
    }

    async fn set_document(&self, path: &str, fields: Fields, merge: bool) -> StoreResult<()> {
        document_segments(path)?;
        let mut documents = self.documents.write().await;
        let existing = documents.remove(path);
        documents.insert(path.to_string(), apply_set(existing, fields, merge));
        tracing::debug!(path = %path, merge, "Memory store document written");
        Ok(())
    }

    async fn create_document(&self, path: &str, fields: Fields) -> StoreResult<bool> {
        document_segments(path)?;
        let mut documents = self.documents.write().await;
        if documents.contains_key(path) {
            return Ok(false);
        }
        documents.insert(path.to_string(), fields);
        tracing::debug!(path = %path, "Memory store document created");
        Ok(true)
    }

    async fn delete_document(&self, path: &str) -> StoreResult<()> {
        document_segments(path)?;
        self.documents.write().await.remove(path);
        Ok(())
    }

    async fn list_collection(&self, path: &str) -> StoreResult<Vec<Document>> {
        collection_segments(path)?;
        let prefix = format!("{}/", path);
        let documents = self.documents.read().await;
        Ok(documents
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, fields)| {
                let id = &key[prefix.len()..];
                if id.contains('/') {
                    return None;
                }
                Some(Document {
                    id: id.to_string(),
                    path: key.clone(),
                    fields: fields.clone(),
                })
            })
            .collect())
    }

    async fn array_union(&self, path: &str, field: &str, values: Vec<Value>) -> StoreResult<()> {
        document_segments(path)?;
        let mut documents = self.documents.write().await;
        let fields = documents.entry(path.to_string()).or_default();
        let changed = apply_union(fields, field, values);
        tracing::debug!(path = %path, field = %field, changed, "Memory store array union");
        Ok(())
    }

    async fn array_remove(&self, path: &str, field: &str, values: Vec<Value>) -> StoreResult<()> {
        document_segments(path)?;
        let mut documents = self.documents.write().await;
        if let Some(fields) = documents.get_mut(path) {
            let changed = apply_remove(fields, field, &values);
            tracing::debug!(path = %path, field = %field, changed, "Memory store array remove");
        }
        Ok(())
    }

    fn backend_type(&self) -> StoreBackend {
        StoreBackend::Memory
    }
}
