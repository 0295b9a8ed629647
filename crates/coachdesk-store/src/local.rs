use crate::fields::{apply_remove, apply_set, apply_union};
use crate::paths::{collection_segments, document_segments};
use crate::traits::{Document, DocumentStore, Fields, StoreError, StoreResult};
use crate::StoreBackend;
use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

const DOCUMENT_EXTENSION: &str = "json";

/// Local filesystem document store
///
/// Each document is one JSON object file: `roles/admins` lives at
/// `{base}/roles/admins.json`, and the collection `tenants/acme/clients` is the
/// directory `{base}/tenants/acme/clients`. Writes go to a temporary file that
/// is renamed into place, and all mutations of one store instance are
/// serialized so array-union/remove never lose updates within the process.
#[derive(Clone)]
pub struct LocalStore {
    base_path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl LocalStore {
    /// Create a new LocalStore instance rooted at `base_path`.
    pub async fn new(base_path: impl Into<PathBuf>) -> StoreResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StoreError::ConfigError(format!(
                "Failed to create store directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStore {
            base_path,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Map a document path to its file, after validating every segment.
    fn document_file(&self, path: &str) -> StoreResult<PathBuf> {
        let segments = document_segments(path)?;
        let mut file = self.base_path.clone();
        for segment in &segments {
            file.push(segment);
        }
        let mut name = file.into_os_string();
        name.push(".");
        name.push(DOCUMENT_EXTENSION);
        Ok(PathBuf::from(name))
    }

    fn collection_dir(&self, path: &str) -> StoreResult<PathBuf> {
        let segments = collection_segments(path)?;
        let mut dir = self.base_path.clone();
        for segment in &segments {
            dir.push(segment);
        }
        Ok(dir)
    }

    async fn read_fields(&self, file: &Path) -> StoreResult<Option<Fields>> {
        let bytes = match fs::read(file).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::IoError(e)),
        };
        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Object(fields) => Ok(Some(fields)),
            _ => Err(StoreError::BackendError(format!(
                "Document file {} does not hold a JSON object",
                file.display()
            ))),
        }
    }

    async fn write_fields(&self, file: &Path, fields: &Fields) -> StoreResult<()> {
        let parent = file.parent().ok_or_else(|| {
            StoreError::BackendError(format!("Document file {} has no parent", file.display()))
        })?;
        fs::create_dir_all(parent).await?;

        let data = serde_json::to_vec_pretty(fields)?;
        let tmp = parent.join(format!(".{}.tmp", Uuid::new_v4()));

        let result = Self::write_and_rename(&tmp, file, &data).await;
        if result.is_err() {
            match fs::remove_file(&tmp).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(file = %tmp.display(), error = %e, "Failed to remove temporary document file");
                }
            }
        }
        result
    }

    async fn write_and_rename(tmp: &Path, file: &Path, data: &[u8]) -> StoreResult<()> {
        let mut handle = fs::File::create(tmp).await.map_err(|e| {
            StoreError::BackendError(format!("Failed to create file {}: {}", tmp.display(), e))
        })?;
        handle.write_all(data).await?;
        handle.sync_all().await?;
        drop(handle);

        fs::rename(tmp, file).await.map_err(|e| {
            StoreError::BackendError(format!(
                "Failed to move {} into place: {}",
                file.display(),
                e
            ))
        })
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    async fn get_document(&self, path: &str) -> StoreResult<Option<Document>> {
        let file = self.document_file(path)?;
        let fields = self.read_fields(&file).await?;
        Ok(fields.map(|fields| Document {
            id: path.rsplit('/').next().unwrap_or(path).to_string(),
            path: path.to_string(),
            fields,
        }))
    }

    async fn set_document(&self, path: &str, fields: Fields, merge: bool) -> StoreResult<()> {
        let file = self.document_file(path)?;
        let _guard = self.write_lock.lock().await;

        let existing = if merge {
            self.read_fields(&file).await?
        } else {
            None
        };
        let merged = apply_set(existing, fields, merge);
        self.write_fields(&file, &merged).await?;

        tracing::debug!(
            path = %path,
            file = %file.display(),
            merge,
            "Local store document written"
        );
        Ok(())
    }

    async fn create_document(&self, path: &str, fields: Fields) -> StoreResult<bool> {
        let file = self.document_file(path)?;
        let _guard = self.write_lock.lock().await;

        if fs::try_exists(&file).await? {
            return Ok(false);
        }
        self.write_fields(&file, &fields).await?;

        tracing::debug!(path = %path, file = %file.display(), "Local store document created");
        Ok(true)
    }

    async fn delete_document(&self, path: &str) -> StoreResult<()> {
        let file = self.document_file(path)?;
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(&file).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::IoError(e)),
        }
    }

    async fn list_collection(&self, path: &str) -> StoreResult<Vec<Document>> {
        let dir = self.collection_dir(path)?;
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::IoError(e)),
        };

        let mut documents = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file = entry.path();
            if file.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(id) = file.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            // The file may have been deleted between listing and reading.
            if let Some(fields) = self.read_fields(&file).await? {
                documents.push(Document {
                    path: format!("{}/{}", path, id),
                    id,
                    fields,
                });
            }
        }
        documents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(documents)
    }

    async fn array_union(&self, path: &str, field: &str, values: Vec<Value>) -> StoreResult<()> {
        let file = self.document_file(path)?;
        let _guard = self.write_lock.lock().await;

        let existing = self.read_fields(&file).await?;
        let existed = existing.is_some();
        let mut fields = existing.unwrap_or_default();
        if apply_union(&mut fields, field, values) || !existed {
            self.write_fields(&file, &fields).await?;
        }
        tracing::debug!(path = %path, field = %field, "Local store array union");
        Ok(())
    }

    async fn array_remove(&self, path: &str, field: &str, values: Vec<Value>) -> StoreResult<()> {
        let file = self.document_file(path)?;
        let _guard = self.write_lock.lock().await;

        let Some(mut fields) = self.read_fields(&file).await? else {
            return Ok(());
        };
        if apply_remove(&mut fields, field, &values) {
            self.write_fields(&file, &fields).await?;
        }
        tracing::debug!(path = %path, field = %field, "Local store array remove");
        Ok(())
    }

    fn backend_type(&self) -> StoreBackend {
        StoreBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_local_store_set_and_get() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        store
            .set_document("tenants/acme", fields(json!({"name": "Acme"})), false)
            .await
            .unwrap();

        assert!(dir.path().join("tenants/acme.json").exists());
        let doc = store.get_document("tenants/acme").await.unwrap().unwrap();
        assert_eq!(doc.id, "acme");
        assert_eq!(doc.get_str("name"), Some("Acme"));
    }

    #[tokio::test]
    async fn test_local_store_merge() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        store
            .set_document("users/u1", fields(json!({"a": 1, "b": 1})), false)
            .await
            .unwrap();
        store
            .set_document("users/u1", fields(json!({"b": 2})), true)
            .await
            .unwrap();

        let doc = store.get_document("users/u1").await.unwrap().unwrap();
        assert_eq!(Value::Object(doc.fields), json!({"a": 1, "b": 2}));
    }

    #[tokio::test]
    async fn test_local_store_document_and_subcollection_coexist() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        store
            .set_document("tenants/acme", Fields::new(), false)
            .await
            .unwrap();
        store
            .set_document("tenants/acme/clients/u1", Fields::new(), false)
            .await
            .unwrap();
        store
            .set_document("tenants/beta", Fields::new(), false)
            .await
            .unwrap();

        let tenants: Vec<String> = store
            .list_collection("tenants")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(tenants, vec!["acme", "beta"]);

        let clients = store.list_collection("tenants/acme/clients").await.unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].path, "tenants/acme/clients/u1");
    }

    #[tokio::test]
    async fn test_local_store_rejects_traversal() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        let result = store.get_document("../etc/passwd").await;
        assert!(matches!(result, Err(StoreError::InvalidPath(_))));

        let result = store.get_document("/etc/passwd").await;
        assert!(matches!(result, Err(StoreError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_local_store_array_ops_persist() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        store
            .array_union("roles/admins", "uids", vec![json!("u1"), json!("u2")])
            .await
            .unwrap();
        store
            .array_remove("roles/admins", "uids", vec![json!("u2")])
            .await
            .unwrap();

        let reopened = LocalStore::new(dir.path()).await.unwrap();
        let doc = reopened.get_document("roles/admins").await.unwrap().unwrap();
        assert_eq!(doc.get("uids"), Some(&json!(["u1"])));
    }

    #[tokio::test]
    async fn test_local_store_delete_nonexistent() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        let result = store.delete_document("users/nobody").await;
        assert!(result.is_ok());
        assert!(store.list_collection("users").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_local_store_create_only_once() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        assert!(store
            .create_document("tenants/acme", fields(json!({"name": "Acme"})))
            .await
            .unwrap());
        assert!(!store
            .create_document("tenants/acme", fields(json!({"name": "Other"})))
            .await
            .unwrap());

        let doc = store.get_document("tenants/acme").await.unwrap().unwrap();
        assert_eq!(doc.get_str("name"), Some("Acme"));
    }

    #[tokio::test]
    async fn test_local_store_failed_write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();
        // A non-empty directory where the document file belongs makes the
        // final rename fail.
        std::fs::create_dir_all(dir.path().join("roles/admins.json/blocker")).unwrap();

        let result = store
            .set_document("roles/admins", fields(json!({"uids": ["u1"]})), false)
            .await;
        assert!(matches!(result, Err(StoreError::BackendError(_))));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("roles"))
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temporary files left behind: {leftovers:?}");
    }

    #[tokio::test]
    async fn test_local_store_corrupt_document() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();
        std::fs::create_dir_all(dir.path().join("roles")).unwrap();
        std::fs::write(dir.path().join("roles/admins.json"), b"[1,2,3]").unwrap();

        let result = store.get_document("roles/admins").await;
        assert!(matches!(result, Err(StoreError::BackendError(_))));
    }
}
