//! Remote document store client.
//!
//! The remote side of the sync layer is a document database organized into
//! a fixed set of collections. This module defines the object-safe client
//! trait plus the change-event and query vocabulary; [`memory`] provides an
//! in-process implementation and [`http`] a REST-backed one.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::Result;

pub use http::HttpRemote;
pub use memory::MemoryRemote;

/// Buffer size for per-collection change feeds.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// The fixed collections of the storefront's document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    Users,
    Orders,
    Carts,
    Products,
    Stock,
    Addresses,
    Refunds,
    ChatMessages,
    SystemSettings,
}

impl Collection {
    /// The collection's name as used in document paths.
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Orders => "orders",
            Collection::Carts => "carts",
            Collection::Products => "products",
            Collection::Stock => "stock",
            Collection::Addresses => "addresses",
            Collection::Refunds => "refunds",
            Collection::ChatMessages => "chatMessages",
            Collection::SystemSettings => "systemSettings",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// An incremental change delivered by a subscription.
///
/// Subscriptions do not order changes relative to local writes from the
/// same session - a client may observe its own write echoed back.
#[derive(Debug, Clone)]
pub struct RemoteChange {
    pub collection: Collection,
    pub kind: ChangeKind,
    pub id: String,
    /// Document contents; the last known contents for removals
    pub doc: Value,
}

/// A document together with its id.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub doc: Value,
}

/// Sort direction for [`Query::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// The query shapes the storefront actually uses: at most one equality
/// filter and at most one ordering field.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filter: Option<(String, Value)>,
    pub order_by: Option<(String, Direction)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only documents whose `field` equals `value`.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter = Some((field.into(), value.into()));
        self
    }

    /// Order ascending by `field`.
    pub fn order_by_asc(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some((field.into(), Direction::Ascending));
        self
    }

    /// Order descending by `field`.
    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some((field.into(), Direction::Descending));
        self
    }

    /// Whether a document passes the filter.
    pub fn matches(&self, doc: &Value) -> bool {
        match &self.filter {
            Some((field, expected)) => doc.get(field) == Some(expected),
            None => true,
        }
    }

    /// Sort documents per the ordering field, if one is set.
    pub fn sort(&self, docs: &mut [Document]) {
        let Some((field, direction)) = &self.order_by else {
            return;
        };
        docs.sort_by(|a, b| {
            let ordering = compare_values(a.doc.get(field), b.doc.get(field));
            match direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            }
        });
    }
}

/// Field ordering: numbers numerically, everything else by its string
/// form (which orders RFC 3339 timestamps chronologically).
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
                x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal)
            } else {
                value_key(a).cmp(&value_key(b))
            }
        }
        (Some(_), None) => std::cmp::Ordering::Greater,
        (None, Some(_)) => std::cmp::Ordering::Less,
        (None, None) => std::cmp::Ordering::Equal,
    }
}

fn value_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Asynchronous CRUD + subscription client over the document store.
///
/// All operations may fail with network or auth errors; callers at the
/// sync layer treat a failed write as "local state is ahead, will retry on
/// the next sync trigger", never as something to roll back.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Whether the backing store is reachable and initialized. Checked
    /// before every remote call by the sync layer.
    fn is_ready(&self) -> bool;

    /// Create or replace a document.
    async fn save(&self, collection: Collection, id: &str, doc: Value) -> Result<()>;

    /// Load one document, `None` when absent.
    async fn load(&self, collection: Collection, id: &str) -> Result<Option<Value>>;

    /// Delete one document.
    async fn delete(&self, collection: Collection, id: &str) -> Result<()>;

    /// Append a document under a store-generated id; returns the id.
    async fn add(&self, collection: Collection, doc: Value) -> Result<String>;

    /// Fetch documents matching a query.
    async fn query(&self, collection: Collection, query: Query) -> Result<Vec<Document>>;

    /// Subscribe to incremental changes for a collection.
    fn subscribe(&self, collection: Collection) -> broadcast::Receiver<RemoteChange>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, value: Value) -> Document {
        Document {
            id: id.into(),
            doc: value,
        }
    }

    #[test]
    fn collection_names() {
        assert_eq!(Collection::ChatMessages.as_str(), "chatMessages");
        assert_eq!(Collection::SystemSettings.to_string(), "systemSettings");
    }

    #[test]
    fn filter_matches_single_field() {
        let query = Query::new().where_eq("userId", "u1");
        assert!(query.matches(&json!({"userId": "u1", "total": 3})));
        assert!(!query.matches(&json!({"userId": "u2"})));
        assert!(!query.matches(&json!({})));
    }

    #[test]
    fn sort_orders_timestamps_descending() {
        let mut docs = vec![
            doc("a", json!({"createdAt": "2024-01-01T00:00:00Z"})),
            doc("b", json!({"createdAt": "2024-03-01T00:00:00Z"})),
            doc("c", json!({"createdAt": "2024-02-01T00:00:00Z"})),
        ];
        Query::new().order_by_desc("createdAt").sort(&mut docs);
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[test]
    fn sort_orders_numbers_numerically() {
        let mut docs = vec![
            doc("a", json!({"n": 10})),
            doc("b", json!({"n": 2})),
            doc("c", json!({"n": 30})),
        ];
        Query::new().order_by_asc("n").sort(&mut docs);
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "c"]);
    }

    #[test]
    fn missing_sort_field_sorts_first() {
        let mut docs = vec![
            doc("a", json!({"n": 1})),
            doc("b", json!({})),
        ];
        Query::new().order_by_asc("n").sort(&mut docs);
        assert_eq!(docs[0].id, "b");
    }
}
