//! REST-backed remote store.
//!
//! Talks to a document-store HTTP API with the obvious layout:
//!
//! - `GET/PUT/DELETE {base}/{collection}/{id}` for single documents
//! - `POST {base}/{collection}` to append under a generated id
//! - `GET {base}/{collection}` with `field`/`value`/`orderBy`/`direction`
//!   query parameters for listing
//! - `GET {base}/health` as the readiness probe
//!
//! The backend has no push channel, so subscriptions are driven by a
//! polling watcher per collection that diffs successive snapshots into
//! added/modified/removed events.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use url::Url;

use super::{
    ChangeKind, Collection, Direction, Document, Query, RemoteChange, RemoteStore,
    CHANGE_CHANNEL_CAPACITY,
};
use crate::error::{RemoteError, Result};

/// How often watchers poll and the readiness probe retries by default.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// A document as listed by the backend.
#[derive(Debug, Deserialize)]
struct ListedDoc {
    id: String,
    doc: Value,
}

/// Response to a `POST {collection}`.
#[derive(Debug, Deserialize)]
struct CreatedDoc {
    id: String,
}

/// HTTP [`RemoteStore`] implementation.
pub struct HttpRemote {
    base: String,
    http: reqwest::Client,
    ready: Arc<AtomicBool>,
    poll_interval: Duration,
    channels: DashMap<Collection, broadcast::Sender<RemoteChange>>,
    tasks: DashMap<Collection, JoinHandle<()>>,
    probe: JoinHandle<()>,
}

impl HttpRemote {
    /// Connect to a document store at `base_url`.
    ///
    /// Returns immediately; readiness is established in the background by
    /// the health probe, and every operation fails with `NotReady` until
    /// the probe succeeds once.
    pub fn connect(base_url: &str) -> Result<Self> {
        Self::connect_with_interval(base_url, DEFAULT_POLL_INTERVAL)
    }

    /// Connect with a custom poll/probe interval.
    pub fn connect_with_interval(base_url: &str, poll_interval: Duration) -> Result<Self> {
        let base = base_url.trim_end_matches('/').to_owned();
        Url::parse(&base).map_err(|_| RemoteError::InvalidUrl(base.clone()))?;

        let http = reqwest::Client::new();
        let ready = Arc::new(AtomicBool::new(false));

        let probe = tokio::spawn(probe_health(
            http.clone(),
            base.clone(),
            Arc::clone(&ready),
            poll_interval,
        ));

        Ok(Self {
            base,
            http,
            ready,
            poll_interval,
            channels: DashMap::new(),
            tasks: DashMap::new(),
            probe,
        })
    }

    fn doc_url(&self, collection: Collection, id: &str) -> String {
        format!("{}/{}/{}", self.base, collection.as_str(), id)
    }

    fn list_url(&self, collection: Collection, query: &Query) -> Result<Url> {
        let raw = format!("{}/{}", self.base, collection.as_str());
        let mut url = Url::parse(&raw).map_err(|_| RemoteError::InvalidUrl(raw))?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some((field, value)) = &query.filter {
                pairs.append_pair("field", field);
                pairs.append_pair("value", &query_value(value));
            }
            if let Some((field, direction)) = &query.order_by {
                pairs.append_pair("orderBy", field);
                pairs.append_pair(
                    "direction",
                    match direction {
                        Direction::Ascending => "asc",
                        Direction::Descending => "desc",
                    },
                );
            }
        }
        Ok(url)
    }

    fn check_ready(&self) -> Result<()> {
        if !self.is_ready() {
            return Err(RemoteError::NotReady);
        }
        Ok(())
    }

    fn sender(&self, collection: Collection) -> broadcast::Sender<RemoteChange> {
        self.channels
            .entry(collection)
            .or_insert_with(|| broadcast::channel(CHANGE_CHANNEL_CAPACITY).0)
            .clone()
    }

    fn ensure_watcher(&self, collection: Collection) {
        if self.tasks.contains_key(&collection) {
            return;
        }
        let task = tokio::spawn(watch_collection(
            self.http.clone(),
            self.base.clone(),
            Arc::clone(&self.ready),
            collection,
            self.sender(collection),
            self.poll_interval,
        ));
        self.tasks.insert(collection, task);
    }
}

impl Drop for HttpRemote {
    fn drop(&mut self) {
        self.probe.abort();
        for entry in self.tasks.iter() {
            entry.value().abort();
        }
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn save(&self, collection: Collection, id: &str, doc: Value) -> Result<()> {
        self.check_ready()?;
        let response = self
            .http
            .put(self.doc_url(collection, id))
            .json(&doc)
            .send()
            .await?;
        expect_success(response.status())
    }

    async fn load(&self, collection: Collection, id: &str) -> Result<Option<Value>> {
        self.check_ready()?;
        let response = self.http.get(self.doc_url(collection, id)).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        expect_success(response.status())?;
        Ok(Some(response.json().await?))
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        self.check_ready()?;
        let response = self
            .http
            .delete(self.doc_url(collection, id))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        expect_success(response.status())
    }

    async fn add(&self, collection: Collection, doc: Value) -> Result<String> {
        self.check_ready()?;
        let raw = format!("{}/{}", self.base, collection.as_str());
        let response = self.http.post(raw).json(&doc).send().await?;
        expect_success(response.status())?;
        let created: CreatedDoc = response.json().await?;
        Ok(created.id)
    }

    async fn query(&self, collection: Collection, query: Query) -> Result<Vec<Document>> {
        self.check_ready()?;
        let response = self.http.get(self.list_url(collection, &query)?).send().await?;
        expect_success(response.status())?;

        let listed: Vec<ListedDoc> = response.json().await?;
        let mut docs: Vec<Document> = listed
            .into_iter()
            .map(|d| Document { id: d.id, doc: d.doc })
            .collect();
        // The backend may not honor ordering; sort locally either way.
        query.sort(&mut docs);
        Ok(docs)
    }

    fn subscribe(&self, collection: Collection) -> broadcast::Receiver<RemoteChange> {
        self.ensure_watcher(collection);
        self.sender(collection).subscribe()
    }
}

fn expect_success(status: reqwest::StatusCode) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(RemoteError::Status(status.as_u16()))
    }
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

async fn probe_health(
    http: reqwest::Client,
    base: String,
    ready: Arc<AtomicBool>,
    interval: Duration,
) {
    let url = format!("{base}/health");
    loop {
        match http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                ready.store(true, Ordering::SeqCst);
                tracing::info!(%base, "remote store is ready");
                return;
            }
            Ok(response) => {
                tracing::debug!(status = %response.status(), "remote store not ready yet");
            }
            Err(error) => {
                tracing::debug!(%error, "remote store unreachable");
            }
        }
        tokio::time::sleep(interval).await;
    }
}

async fn watch_collection(
    http: reqwest::Client,
    base: String,
    ready: Arc<AtomicBool>,
    collection: Collection,
    sender: broadcast::Sender<RemoteChange>,
    interval: Duration,
) {
    let url = format!("{}/{}", base, collection.as_str());
    let mut snapshot: BTreeMap<String, Value> = BTreeMap::new();
    let mut primed = false;

    loop {
        tokio::time::sleep(interval).await;
        if !ready.load(Ordering::SeqCst) {
            continue;
        }

        let listed: Vec<ListedDoc> = match http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                match response.json().await {
                    Ok(listed) => listed,
                    Err(error) => {
                        tracing::warn!(%collection, %error, "watcher got malformed listing");
                        continue;
                    }
                }
            }
            Ok(response) => {
                tracing::debug!(%collection, status = %response.status(), "watcher poll failed");
                continue;
            }
            Err(error) => {
                tracing::debug!(%collection, %error, "watcher poll failed");
                continue;
            }
        };

        let next: BTreeMap<String, Value> =
            listed.into_iter().map(|d| (d.id, d.doc)).collect();

        if primed {
            for change in diff_snapshots(collection, &snapshot, &next) {
                let _ = sender.send(change);
            }
        }
        snapshot = next;
        primed = true;
    }
}

/// Diff two collection snapshots into change events.
fn diff_snapshots(
    collection: Collection,
    previous: &BTreeMap<String, Value>,
    next: &BTreeMap<String, Value>,
) -> Vec<RemoteChange> {
    let mut changes = Vec::new();

    for (id, doc) in next {
        match previous.get(id) {
            None => changes.push(RemoteChange {
                collection,
                kind: ChangeKind::Added,
                id: id.clone(),
                doc: doc.clone(),
            }),
            Some(old) if old != doc => changes.push(RemoteChange {
                collection,
                kind: ChangeKind::Modified,
                id: id.clone(),
                doc: doc.clone(),
            }),
            Some(_) => {}
        }
    }

    for (id, doc) in previous {
        if !next.contains_key(id) {
            changes.push(RemoteChange {
                collection,
                kind: ChangeKind::Removed,
                id: id.clone(),
                doc: doc.clone(),
            });
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn urls_are_built_from_base_and_collection() {
        let remote = HttpRemote::connect("http://localhost:9000/").unwrap();
        assert_eq!(
            remote.doc_url(Collection::Carts, "u1"),
            "http://localhost:9000/carts/u1"
        );

        let url = remote
            .list_url(
                Collection::Orders,
                &Query::new().where_eq("userId", "u1").order_by_desc("createdAt"),
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/orders?field=userId&value=u1&orderBy=createdAt&direction=desc"
        );
    }

    #[tokio::test]
    async fn rejects_invalid_base_url() {
        assert!(matches!(
            HttpRemote::connect("not a url"),
            Err(RemoteError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn starts_unready() {
        let remote = HttpRemote::connect("http://localhost:9000").unwrap();
        assert!(!remote.is_ready());
        let err = remote
            .save(Collection::Carts, "u1", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::NotReady));
    }

    #[test]
    fn diff_detects_all_change_kinds() {
        let previous = BTreeMap::from([
            ("kept".to_owned(), json!({"v": 1})),
            ("changed".to_owned(), json!({"v": 1})),
            ("gone".to_owned(), json!({"v": 1})),
        ]);
        let next = BTreeMap::from([
            ("kept".to_owned(), json!({"v": 1})),
            ("changed".to_owned(), json!({"v": 2})),
            ("new".to_owned(), json!({"v": 1})),
        ]);

        let changes = diff_snapshots(Collection::Products, &previous, &next);
        assert_eq!(changes.len(), 3);

        let kind_of = |id: &str| {
            changes
                .iter()
                .find(|c| c.id == id)
                .map(|c| c.kind)
                .unwrap()
        };
        assert_eq!(kind_of("new"), ChangeKind::Added);
        assert_eq!(kind_of("changed"), ChangeKind::Modified);
        assert_eq!(kind_of("gone"), ChangeKind::Removed);
        assert!(!changes.iter().any(|c| c.id == "kept"));
    }

    #[test]
    fn query_values_serialize_plainly() {
        assert_eq!(query_value(&json!("u1")), "u1");
        assert_eq!(query_value(&json!(7)), "7");
        assert_eq!(query_value(&json!(true)), "true");
    }
}
