//! Concurrent array-union must never lose a value, whatever the backend.

use coachdesk_store::{DocumentStore, MemoryStore};
use futures::future::join_all;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

const WRITERS: usize = 32;

async fn union_from_many_tasks(store: Arc<dyn DocumentStore>) {
    let tasks = (0..WRITERS).map(|i| {
        let store = store.clone();
        tokio::spawn(async move {
            store
                .array_union("roles/superadmins", "uids", vec![json!(format!("user-{i}"))])
                .await
        })
    });

    for result in join_all(tasks).await {
        result.expect("task panicked").expect("array union failed");
    }

    let doc = store
        .get_document("roles/superadmins")
        .await
        .unwrap()
        .expect("roster document created");
    let members: BTreeSet<String> = doc
        .get("uids")
        .and_then(Value::as_array)
        .expect("uids array")
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();

    assert_eq!(members.len(), WRITERS);
    for i in 0..WRITERS {
        assert!(members.contains(&format!("user-{i}")));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn memory_store_concurrent_union_keeps_every_member() {
    union_from_many_tasks(Arc::new(MemoryStore::new())).await;
}

#[cfg(feature = "store-local")]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn local_store_concurrent_union_keeps_every_member() {
    let dir = tempfile::tempdir().unwrap();
    let store = coachdesk_store::LocalStore::new(dir.path()).await.unwrap();
    union_from_many_tasks(Arc::new(store)).await;
}
