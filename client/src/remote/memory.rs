//! In-process remote store.
//!
//! A document store living in this process: per-collection ordered maps
//! plus a broadcast change feed per collection. Tests and offline runs use
//! it in place of the real backend; the readiness toggle exercises the
//! remote-unavailable paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;

use super::{
    ChangeKind, Collection, Document, Query, RemoteChange, RemoteStore, CHANGE_CHANNEL_CAPACITY,
};
use crate::error::{RemoteError, Result};

/// In-memory [`RemoteStore`] implementation.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    collections: DashMap<Collection, BTreeMap<String, Value>>,
    channels: DashMap<Collection, broadcast::Sender<RemoteChange>>,
    unready: AtomicBool,
}

impl MemoryRemote {
    /// A ready, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle readiness; while unready every operation fails with
    /// [`RemoteError::NotReady`].
    pub fn set_ready(&self, ready: bool) {
        self.unready.store(!ready, Ordering::SeqCst);
    }

    /// Number of documents in a collection (test helper).
    pub fn len(&self, collection: Collection) -> usize {
        self.collections
            .get(&collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    /// Whether a collection holds no documents.
    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }

    fn sender(&self, collection: Collection) -> broadcast::Sender<RemoteChange> {
        self.channels
            .entry(collection)
            .or_insert_with(|| broadcast::channel(CHANGE_CHANNEL_CAPACITY).0)
            .clone()
    }

    fn publish(&self, collection: Collection, kind: ChangeKind, id: &str, doc: Value) {
        // No receivers is fine; the feed is best-effort.
        let _ = self.sender(collection).send(RemoteChange {
            collection,
            kind,
            id: id.to_owned(),
            doc,
        });
    }

    fn check_ready(&self) -> Result<()> {
        if self.unready.load(Ordering::SeqCst) {
            return Err(RemoteError::NotReady);
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    fn is_ready(&self) -> bool {
        !self.unready.load(Ordering::SeqCst)
    }

    async fn save(&self, collection: Collection, id: &str, doc: Value) -> Result<()> {
        self.check_ready()?;
        let kind = {
            let mut docs = self.collections.entry(collection).or_default();
            match docs.insert(id.to_owned(), doc.clone()) {
                Some(_) => ChangeKind::Modified,
                None => ChangeKind::Added,
            }
        };
        self.publish(collection, kind, id, doc);
        Ok(())
    }

    async fn load(&self, collection: Collection, id: &str) -> Result<Option<Value>> {
        self.check_ready()?;
        Ok(self
            .collections
            .get(&collection)
            .and_then(|docs| docs.get(id).cloned()))
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        self.check_ready()?;
        let removed = self
            .collections
            .entry(collection)
            .or_default()
            .remove(id);
        if let Some(doc) = removed {
            self.publish(collection, ChangeKind::Removed, id, doc);
        }
        Ok(())
    }

    async fn add(&self, collection: Collection, doc: Value) -> Result<String> {
        self.check_ready()?;
        let id = uuid::Uuid::new_v4().to_string();
        self.save(collection, &id, doc).await?;
        Ok(id)
    }

    async fn query(&self, collection: Collection, query: Query) -> Result<Vec<Document>> {
        self.check_ready()?;
        let mut results: Vec<Document> = self
            .collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, doc)| query.matches(doc))
                    .map(|(id, doc)| Document {
                        id: id.clone(),
                        doc: doc.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        query.sort(&mut results);
        Ok(results)
    }

    fn subscribe(&self, collection: Collection) -> broadcast::Receiver<RemoteChange> {
        self.sender(collection).subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn save_load_roundtrip() {
        let remote = MemoryRemote::new();
        remote
            .save(Collection::Carts, "u1", json!({"items": []}))
            .await
            .unwrap();

        let doc = remote.load(Collection::Carts, "u1").await.unwrap();
        assert_eq!(doc, Some(json!({"items": []})));
        assert_eq!(remote.load(Collection::Carts, "u2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unready_store_refuses_everything() {
        let remote = MemoryRemote::new();
        remote.set_ready(false);
        assert!(!remote.is_ready());

        let err = remote
            .save(Collection::Carts, "u1", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::NotReady));
        assert!(remote.load(Collection::Carts, "u1").await.is_err());
    }

    #[tokio::test]
    async fn subscription_sees_save_and_delete() {
        let remote = MemoryRemote::new();
        let mut rx = remote.subscribe(Collection::Products);

        remote
            .save(Collection::Products, "mike", json!({"price": 10}))
            .await
            .unwrap();
        remote
            .save(Collection::Products, "mike", json!({"price": 12}))
            .await
            .unwrap();
        remote.delete(Collection::Products, "mike").await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind, ChangeKind::Added);
        assert_eq!(first.id, "mike");

        let second = rx.recv().await.unwrap();
        assert_eq!(second.kind, ChangeKind::Modified);

        let third = rx.recv().await.unwrap();
        assert_eq!(third.kind, ChangeKind::Removed);
        assert_eq!(third.doc, json!({"price": 12}));
    }

    #[tokio::test]
    async fn delete_of_absent_doc_is_silent() {
        let remote = MemoryRemote::new();
        let mut rx = remote.subscribe(Collection::Products);
        remote.delete(Collection::Products, "ghost").await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn query_filters_and_orders() {
        let remote = MemoryRemote::new();
        for (id, user, created) in [
            ("1", "u1", "2024-01-01T00:00:00Z"),
            ("2", "u2", "2024-02-01T00:00:00Z"),
            ("3", "u1", "2024-03-01T00:00:00Z"),
        ] {
            remote
                .save(
                    Collection::Orders,
                    id,
                    json!({"userId": user, "createdAt": created}),
                )
                .await
                .unwrap();
        }

        let mine = remote
            .query(Collection::Orders, Query::new().where_eq("userId", "u1"))
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);

        let newest_first = remote
            .query(Collection::Orders, Query::new().order_by_desc("createdAt"))
            .await
            .unwrap();
        let ids: Vec<_> = newest_first.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["3", "2", "1"]);
    }

    #[tokio::test]
    async fn add_generates_distinct_ids() {
        let remote = MemoryRemote::new();
        let a = remote
            .add(Collection::ChatMessages, json!({"text": "hi"}))
            .await
            .unwrap();
        let b = remote
            .add(Collection::ChatMessages, json!({"text": "again"}))
            .await
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(remote.len(Collection::ChatMessages), 2);
    }
}
