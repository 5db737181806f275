//! Sync engine - keeps the local store and the remote store eventually
//! consistent, one merge policy per entity class.
//!
//! Pushes run immediately after the local mutation that triggered them;
//! pulls run on explicit request, on a timed delay after [`SyncEngine::start`],
//! or continuously through subscriptions. Remote failures never propagate:
//! they are logged and reported as a [`SyncOutcome`], and the local mutation
//! stands - local state is simply ahead until the next successful sync.

pub mod refresh;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use cardforce_engine::{
    address::{self, Address},
    cart::{self, CartItem},
    inbox::Message,
    keys, product,
    stock::{self, StockMap},
    CachedUser, LocalStore, Order, Product, ProductBook, ProductChange, Refund,
};

use crate::config::Config;
use crate::error::RemoteError;
use crate::remote::{ChangeKind, Collection, Query, RemoteChange, RemoteStore};
use self::refresh::{RefreshHub, RefreshKind};

/// Outcome of one sync operation.
///
/// Replaces fire-and-forget logging: callers and tests can assert on what
/// actually happened instead of scraping logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The remote store accepted the operation.
    Completed,
    /// The remote store was not ready; nothing was attempted. Local state
    /// is ahead and the next sync trigger will catch up.
    RemoteUnavailable,
    /// The remote store rejected or failed the operation.
    Failed(String),
}

impl SyncOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SyncOutcome::Completed)
    }
}

/// Bidirectional reconciliation between the local store and a remote store.
pub struct SyncEngine {
    local: Arc<LocalStore>,
    remote: Arc<dyn RemoteStore>,
    hub: Arc<RefreshHub>,
    config: Arc<Config>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    cart_listener: AtomicBool,
    product_listener: AtomicBool,
}

impl SyncEngine {
    pub fn new(
        local: Arc<LocalStore>,
        remote: Arc<dyn RemoteStore>,
        hub: Arc<RefreshHub>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            local,
            remote,
            hub,
            config,
            tasks: Mutex::new(Vec::new()),
            cart_listener: AtomicBool::new(false),
            product_listener: AtomicBool::new(false),
        }
    }

    /// Kick off the standing sync work: the live products subscription now,
    /// the cart listener and the initial stock pull on their configured
    /// delays.
    pub fn start(self: &Arc<Self>, user_id: Option<String>) {
        self.start_product_listener();

        let mut spawned = Vec::new();

        if let Some(user) = user_id {
            let engine = Arc::clone(self);
            let delay = self.config.cart_listener_delay;
            spawned.push(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                engine.start_cart_listener(&user);
            }));
        }

        let engine = Arc::clone(self);
        let delay = self.config.stock_pull_delay;
        spawned.push(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            engine.pull_stock().await;
        }));

        self.tasks.lock().expect("task lock").extend(spawned);
    }

    /// Abort every listener and timed task.
    pub fn stop(&self) {
        for task in self.tasks.lock().expect("task lock").drain(..) {
            task.abort();
        }
        self.cart_listener.store(false, Ordering::SeqCst);
        self.product_listener.store(false, Ordering::SeqCst);
    }

    // ----- cart ------------------------------------------------------------

    /// Push the user's cart wholesale to the remote store.
    pub async fn push_cart(&self, user_id: &str) -> SyncOutcome {
        if !self.remote.is_ready() {
            return SyncOutcome::RemoteUnavailable;
        }
        let items = cart::cart_items(&self.local, user_id);
        let doc = json!({
            "userId": user_id,
            "items": items,
            "lastUpdated": Utc::now(),
        });
        self.outcome("cart push", self.remote.save(Collection::Carts, user_id, doc).await)
    }

    /// Attach the real-time cart listener: any change to the user's remote
    /// cart document replaces the local cart wholesale (remote wins
    /// unconditionally). Returns whether a listener was attached.
    pub fn start_cart_listener(&self, user_id: &str) -> bool {
        if !self.remote.is_ready() {
            tracing::debug!("cart listener skipped: remote not ready");
            return false;
        }
        if self.cart_listener.swap(true, Ordering::SeqCst) {
            return false;
        }

        let rx = self.remote.subscribe(Collection::Carts);
        let local = Arc::clone(&self.local);
        let hub = Arc::clone(&self.hub);
        let user = user_id.to_owned();

        let task = tokio::spawn(run_cart_listener(rx, local, hub, user));
        self.tasks.lock().expect("task lock").push(task);
        tracing::info!(user = %user_id, "cart listener attached");
        true
    }

    // ----- stock -----------------------------------------------------------

    /// Pull the remote stock map and merge it field-by-field: every id
    /// present remotely overwrites local, ids absent remotely are left
    /// alone.
    pub async fn pull_stock(&self) -> SyncOutcome {
        if !self.remote.is_ready() {
            return SyncOutcome::RemoteUnavailable;
        }
        let docs = match self.remote.query(Collection::Stock, Query::new()).await {
            Ok(docs) => docs,
            Err(error) => return self.failed("stock pull", error),
        };

        let remote: StockMap = docs
            .iter()
            .filter_map(|d| {
                d.doc
                    .get("stock")
                    .and_then(Value::as_u64)
                    .map(|qty| (d.id.clone(), qty as u32))
            })
            .collect();
        stock::merge_remote_stock(&self.local, &remote);
        tracing::debug!(items = remote.len(), "stock merged from remote");
        SyncOutcome::Completed
    }

    /// Push one item's current stock count.
    pub async fn push_stock(&self, item_id: &str) -> SyncOutcome {
        if !self.remote.is_ready() {
            return SyncOutcome::RemoteUnavailable;
        }
        let doc = json!({
            "itemId": item_id,
            "stock": stock::get_stock(&self.local, item_id),
            "lastUpdated": Utc::now(),
        });
        self.outcome(
            "stock push",
            self.remote.save(Collection::Stock, item_id, doc).await,
        )
    }

    // ----- products --------------------------------------------------------

    /// Push every local product unconditionally (the catalog-save path).
    /// Pushes run concurrently and are not serialized against each other.
    pub async fn push_products(&self) -> SyncOutcome {
        if !self.remote.is_ready() {
            return SyncOutcome::RemoteUnavailable;
        }
        let book = ProductBook::load(&self.local);
        let total = book.data().len();

        let pushes = book.data().values().map(|p| self.push_product_doc(p));
        let failures = futures::future::join_all(pushes)
            .await
            .into_iter()
            .filter(|ok| !ok)
            .count();

        if failures == 0 {
            SyncOutcome::Completed
        } else {
            SyncOutcome::Failed(format!("{failures} of {total} product pushes failed"))
        }
    }

    /// Push one product.
    pub async fn push_product(&self, product: &Product) -> SyncOutcome {
        if !self.remote.is_ready() {
            return SyncOutcome::RemoteUnavailable;
        }
        if self.push_product_doc(product).await {
            SyncOutcome::Completed
        } else {
            SyncOutcome::Failed(format!("product {} push failed", product.id))
        }
    }

    async fn push_product_doc(&self, product: &Product) -> bool {
        let doc = match serde_json::to_value(product) {
            Ok(doc) => doc,
            Err(error) => {
                tracing::warn!(product = %product.id, %error, "product not serializable");
                return false;
            }
        };
        match self
            .remote
            .save(Collection::Products, &product.id, doc)
            .await
        {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(product = %product.id, %error, "product push failed");
                false
            }
        }
    }

    /// Delete a product document remotely.
    pub async fn delete_product(&self, product_id: &str) -> SyncOutcome {
        if !self.remote.is_ready() {
            return SyncOutcome::RemoteUnavailable;
        }
        self.outcome(
            "product delete",
            self.remote.delete(Collection::Products, product_id).await,
        )
    }

    /// Explicit product pull, merged with respect for local tombstones: a
    /// locally removed product is never resurrected by this path.
    pub async fn pull_products(&self) -> SyncOutcome {
        if !self.remote.is_ready() {
            return SyncOutcome::RemoteUnavailable;
        }
        let docs = match self.remote.query(Collection::Products, Query::new()).await {
            Ok(docs) => docs,
            Err(error) => return self.failed("product pull", error),
        };

        let remote: Vec<Product> = docs
            .into_iter()
            .filter_map(|d| product_from_doc(&d.id, d.doc))
            .collect();

        let mut book = ProductBook::load(&self.local);
        let merged = book.merge_remote(remote);
        book.save(&self.local);
        tracing::debug!(merged = merged.len(), "products merged from remote");

        self.hub.notify_product_views();
        SyncOutcome::Completed
    }

    /// Attach the live products subscription. Added/modified upsert into
    /// both product representations; removed deletes from both - the one
    /// entity class where removal propagates remote to local.
    pub fn start_product_listener(&self) -> bool {
        if !self.remote.is_ready() {
            tracing::debug!("product listener skipped: remote not ready");
            return false;
        }
        if self.product_listener.swap(true, Ordering::SeqCst) {
            return false;
        }

        let rx = self.remote.subscribe(Collection::Products);
        let local = Arc::clone(&self.local);
        let hub = Arc::clone(&self.hub);

        let task = tokio::spawn(run_product_listener(rx, local, hub));
        self.tasks.lock().expect("task lock").push(task);
        tracing::info!("product listener attached");
        true
    }

    // ----- addresses -------------------------------------------------------

    /// Push every local address under its `{user}_{address}` composite id.
    pub async fn push_addresses(&self, user_id: &str) -> SyncOutcome {
        if !self.remote.is_ready() {
            return SyncOutcome::RemoteUnavailable;
        }
        let list = address::addresses(&self.local, user_id);
        let mut failures = 0usize;

        for entry in &list {
            let Some(address_id) = entry.id else { continue };
            let mut owned = entry.clone();
            owned.user_id = Some(user_id.to_owned());

            let mut doc = match serde_json::to_value(&owned) {
                Ok(doc) => doc,
                Err(_) => continue,
            };
            if let Some(obj) = doc.as_object_mut() {
                obj.insert("lastUpdated".into(), json!(Utc::now()));
            }

            let composite = format!("{user_id}_{address_id}");
            if let Err(error) = self
                .remote
                .save(Collection::Addresses, &composite, doc)
                .await
            {
                tracing::warn!(address = address_id, %error, "address push failed");
                failures += 1;
            }
        }

        if failures == 0 {
            SyncOutcome::Completed
        } else {
            SyncOutcome::Failed(format!("{failures} of {} address pushes failed", list.len()))
        }
    }

    /// Explicit address pull: replaces the entire local list.
    pub async fn pull_addresses(&self, user_id: &str) -> SyncOutcome {
        if !self.remote.is_ready() {
            return SyncOutcome::RemoteUnavailable;
        }
        let docs = match self
            .remote
            .query(
                Collection::Addresses,
                Query::new().where_eq("userId", user_id),
            )
            .await
        {
            Ok(docs) => docs,
            Err(error) => return self.failed("address pull", error),
        };

        let list: Vec<Address> = docs
            .into_iter()
            .filter_map(|d| {
                let mut parsed: Address = serde_json::from_value(d.doc).ok()?;
                // The composite document id carries the address id.
                parsed.id = d
                    .id
                    .split_once('_')
                    .and_then(|(_, tail)| tail.parse().ok())
                    .or(parsed.id);
                Some(parsed)
            })
            .collect();

        address::replace_addresses(&self.local, user_id, &list);
        SyncOutcome::Completed
    }

    // ----- orders & refunds ------------------------------------------------

    /// Push one order document.
    pub async fn push_order(&self, order: &Order) -> SyncOutcome {
        if !self.remote.is_ready() {
            return SyncOutcome::RemoteUnavailable;
        }
        let doc = match serde_json::to_value(order) {
            Ok(doc) => doc,
            Err(error) => return SyncOutcome::Failed(error.to_string()),
        };
        self.outcome(
            "order push",
            self.remote
                .save(Collection::Orders, &order.id.to_string(), doc)
                .await,
        )
    }

    /// Explicit order pull for listing views: the signed-in user's orders,
    /// or every order newest-first for the admin view. Not merged back into
    /// the local list.
    pub async fn pull_orders(&self, user_id: Option<&str>) -> Result<Vec<Order>, RemoteError> {
        if !self.remote.is_ready() {
            return Err(RemoteError::NotReady);
        }
        let query = match user_id {
            Some(user) => Query::new().where_eq("userId", user),
            None => Query::new().order_by_desc("createdAt"),
        };
        let docs = self.remote.query(Collection::Orders, query).await?;

        let orders = docs
            .into_iter()
            .filter_map(|d| match serde_json::from_value::<Order>(d.doc) {
                Ok(order) => Some(order),
                Err(error) => {
                    tracing::warn!(doc = %d.id, %error, "skipping malformed order");
                    None
                }
            })
            .collect();
        Ok(orders)
    }

    /// Push one refund document.
    pub async fn push_refund(&self, refund: &Refund) -> SyncOutcome {
        if !self.remote.is_ready() {
            return SyncOutcome::RemoteUnavailable;
        }
        let doc = match serde_json::to_value(refund) {
            Ok(doc) => doc,
            Err(error) => return SyncOutcome::Failed(error.to_string()),
        };
        self.outcome(
            "refund push",
            self.remote
                .save(Collection::Refunds, &refund.id.to_string(), doc)
                .await,
        )
    }

    // ----- inbox -----------------------------------------------------------

    /// Append an inbox message to the chat-messages collection.
    pub async fn push_chat_message(&self, conversation_id: &str, message: &Message) -> SyncOutcome {
        if !self.remote.is_ready() {
            return SyncOutcome::RemoteUnavailable;
        }
        let doc = json!({
            "conversationId": conversation_id,
            "from": message.sender,
            "type": message.kind,
            "text": message.text,
            "timestamp": message.created_at,
        });
        self.outcome(
            "chat message push",
            self.remote.add(Collection::ChatMessages, doc).await.map(|_| ()),
        )
    }

    /// Load a conversation's remote history, oldest first.
    pub async fn pull_chat_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<Value>, RemoteError> {
        if !self.remote.is_ready() {
            return Err(RemoteError::NotReady);
        }
        let docs = self
            .remote
            .query(
                Collection::ChatMessages,
                Query::new()
                    .where_eq("conversationId", conversation_id)
                    .order_by_asc("timestamp"),
            )
            .await?;
        Ok(docs.into_iter().map(|d| d.doc).collect())
    }

    // ----- user profile & designs ------------------------------------------

    /// Upsert the signed-in user's profile document: created with both
    /// timestamps on first sign-in, `lastLogin` refreshed afterwards.
    pub async fn sync_user_profile(&self, user: &CachedUser) -> SyncOutcome {
        if !self.remote.is_ready() {
            return SyncOutcome::RemoteUnavailable;
        }
        let existing = match self.remote.load(Collection::Users, &user.sub).await {
            Ok(existing) => existing,
            Err(error) => return self.failed("user profile sync", error),
        };

        let doc = match existing {
            Some(mut doc) => {
                if let Some(obj) = doc.as_object_mut() {
                    obj.insert("lastLogin".into(), json!(Utc::now()));
                }
                doc
            }
            None => json!({
                "uid": user.sub,
                "email": user.email,
                "displayName": user.name,
                "photoURL": user.picture,
                "createdAt": Utc::now(),
                "lastLogin": Utc::now(),
            }),
        };
        self.outcome(
            "user profile sync",
            self.remote.save(Collection::Users, &user.sub, doc).await,
        )
    }

    /// Mirror the user's saved designs into their profile document.
    pub async fn push_saved_designs(&self, user_id: &str) -> SyncOutcome {
        if !self.remote.is_ready() {
            return SyncOutcome::RemoteUnavailable;
        }
        let designs: Vec<Value> = self.local.get(&keys::saved_designs(user_id));
        if designs.is_empty() {
            return SyncOutcome::Completed;
        }

        let mut doc = match self.remote.load(Collection::Users, user_id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => json!({"uid": user_id}),
            Err(error) => return self.failed("design push", error),
        };
        if let Some(obj) = doc.as_object_mut() {
            obj.insert("savedDesigns".into(), json!(designs));
            obj.insert("lastDesignSync".into(), json!(Utc::now()));
        }
        self.outcome(
            "design push",
            self.remote.save(Collection::Users, user_id, doc).await,
        )
    }

    /// Copy remotely saved designs back into the local store.
    pub async fn pull_saved_designs(&self, user_id: &str) -> SyncOutcome {
        if !self.remote.is_ready() {
            return SyncOutcome::RemoteUnavailable;
        }
        match self.remote.load(Collection::Users, user_id).await {
            Ok(Some(doc)) => {
                if let Some(designs) = doc.get("savedDesigns") {
                    self.local.set(&keys::saved_designs(user_id), designs);
                }
                SyncOutcome::Completed
            }
            Ok(None) => SyncOutcome::Completed,
            Err(error) => self.failed("design pull", error),
        }
    }

    // ----- site freeze -----------------------------------------------------

    /// Mirror the maintenance flag into the shared settings document so
    /// admin devices agree.
    pub async fn push_site_freeze(&self, frozen: bool) -> SyncOutcome {
        if !self.remote.is_ready() {
            return SyncOutcome::RemoteUnavailable;
        }
        let doc = json!({
            "isFrozen": frozen,
            "lastUpdated": Utc::now(),
            "updatedBy": "admin",
        });
        self.outcome(
            "site freeze push",
            self.remote
                .save(Collection::SystemSettings, "siteFreeze", doc)
                .await,
        )
    }

    /// Read the shared site-freeze state, if one was ever written.
    pub async fn pull_site_freeze(&self) -> Result<Option<bool>, RemoteError> {
        if !self.remote.is_ready() {
            return Err(RemoteError::NotReady);
        }
        let doc = self
            .remote
            .load(Collection::SystemSettings, "siteFreeze")
            .await?;
        Ok(doc.and_then(|d| d.get("isFrozen").and_then(Value::as_bool)))
    }

    // -----------------------------------------------------------------------

    fn outcome(&self, what: &str, result: Result<(), RemoteError>) -> SyncOutcome {
        match result {
            Ok(()) => SyncOutcome::Completed,
            Err(error) => self.failed(what, error),
        }
    }

    fn failed(&self, what: &str, error: RemoteError) -> SyncOutcome {
        tracing::warn!(%error, "{what} failed");
        SyncOutcome::Failed(error.to_string())
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("cart_listener", &self.cart_listener)
            .field("product_listener", &self.product_listener)
            .finish_non_exhaustive()
    }
}

async fn run_cart_listener(
    mut rx: broadcast::Receiver<RemoteChange>,
    local: Arc<LocalStore>,
    hub: Arc<RefreshHub>,
    user_id: String,
) {
    loop {
        match rx.recv().await {
            Ok(change) if change.id == user_id => {
                if change.kind == ChangeKind::Removed {
                    continue;
                }
                let items: Vec<CartItem> = change
                    .doc
                    .get("items")
                    .and_then(|items| serde_json::from_value(items.clone()).ok())
                    .unwrap_or_default();

                cart::replace_cart(&local, &user_id, &items);
                hub.notify(RefreshKind::Cart);
                tracing::debug!(items = items.len(), "cart replaced from remote");
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "cart listener lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn run_product_listener(
    mut rx: broadcast::Receiver<RemoteChange>,
    local: Arc<LocalStore>,
    hub: Arc<RefreshHub>,
) {
    loop {
        match rx.recv().await {
            Ok(change) => {
                let applied = match change.kind {
                    ChangeKind::Added | ChangeKind::Modified => {
                        product_from_doc(&change.id, change.doc).map(ProductChange::Upsert)
                    }
                    ChangeKind::Removed => Some(ProductChange::Remove(change.id)),
                };
                let Some(applied) = applied else { continue };

                let mut book = ProductBook::load(&local);
                book.apply_change(applied);
                book.save(&local);
                hub.notify_product_views();
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "product listener lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Parse a product document, letting the document id win over any embedded
/// id field.
fn product_from_doc(id: &str, mut doc: Value) -> Option<product::Product> {
    let obj = doc.as_object_mut()?;
    obj.insert("id".into(), json!(id));
    match serde_json::from_value(doc) {
        Ok(product) => Some(product),
        Err(error) => {
            tracing::warn!(doc = %id, %error, "skipping malformed product");
            None
        }
    }
}
