//! The storefront facade.
//!
//! One explicit context object owning the local store, the remote client,
//! the sync engine, the session and the notifier - the domain operations
//! hang off it in the submodules (cart/addresses, catalog/stock, orders,
//! inbox). Lifecycle is `start`/`stop`; nothing lives in ambient globals.

mod cart;
mod catalog;
mod inbox;
mod orders;

use std::sync::Arc;

use cardforce_engine::{stock, CachedUser, LocalStore};

use crate::config::Config;
use crate::notify::Notifier;
use crate::remote::RemoteStore;
use crate::session::Session;
use crate::modes::PageModes;
use crate::sync::refresh::RefreshHub;
use crate::sync::{SyncEngine, SyncOutcome};

/// Client-side glue for the storefront: local persistence, remote sync,
/// session gating and notification hand-off behind one context object.
pub struct Storefront {
    local: Arc<LocalStore>,
    config: Arc<Config>,
    hub: Arc<RefreshHub>,
    sync: Arc<SyncEngine>,
    session: Session,
    modes: PageModes,
    notifier: Arc<dyn Notifier>,
}

impl Storefront {
    /// Build a storefront over an in-memory local store.
    pub fn new(remote: Arc<dyn RemoteStore>, notifier: Arc<dyn Notifier>, config: Config) -> Self {
        Self::with_local(Arc::new(LocalStore::in_memory()), remote, notifier, config)
    }

    /// Build a storefront over an existing local store (e.g. a durable
    /// platform backend).
    pub fn with_local(
        local: Arc<LocalStore>,
        remote: Arc<dyn RemoteStore>,
        notifier: Arc<dyn Notifier>,
        config: Config,
    ) -> Self {
        let config = Arc::new(config);
        let hub = Arc::new(RefreshHub::new());
        let sync = Arc::new(SyncEngine::new(
            Arc::clone(&local),
            remote,
            Arc::clone(&hub),
            Arc::clone(&config),
        ));
        let session = Session::new(Arc::clone(&local), Arc::clone(&config));
        let modes = PageModes::new(Arc::clone(&local), Arc::clone(&config));

        Self {
            local,
            config,
            hub,
            sync,
            session,
            modes,
            notifier,
        }
    }

    /// Start the standing work: seed stock, watch the signed-in user, and
    /// kick off the sync engine's listeners and timed initial pulls.
    pub fn start(&self) {
        stock::seed_stock(&self.local, &self.config.stock_seeds);
        self.session.start_watch();
        self.sync
            .start(self.session.current_user().map(|u| u.sub));
    }

    /// Tear down listeners and watches.
    pub fn stop(&self) {
        self.sync.stop();
        self.session.stop_watch();
    }

    /// Cache a sign-in and upsert the user's remote profile document.
    pub async fn sign_in(&self, user: &CachedUser) -> SyncOutcome {
        self.session.sign_in(user);
        self.sync.sync_user_profile(user).await
    }

    /// Clear the cached identity.
    pub fn sign_out(&self) {
        self.session.sign_out();
    }

    pub fn local(&self) -> &Arc<LocalStore> {
        &self.local
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn hub(&self) -> &Arc<RefreshHub> {
        &self.hub
    }

    pub fn sync(&self) -> &Arc<SyncEngine> {
        &self.sync
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn modes(&self) -> &PageModes {
        &self.modes
    }

    pub(crate) fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// The signed-in user's id, when one is cached.
    pub(crate) fn current_user_id(&self) -> Option<String> {
        self.session.current_user().map(|u| u.sub)
    }
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
