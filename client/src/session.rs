//! Session and identity.
//!
//! Wraps the cached sign-in record with the admin gating predicate and the
//! background watch that re-runs admin setup whenever the signed-in email
//! changes. Admin gating is advisory UI state, not an access-control
//! boundary - the remote store's server-side rules are the authority.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use cardforce_engine::{identity, CachedUser, LocalStore, UserChangeTracker};

use crate::config::Config;

type AdminHook = Arc<dyn Fn(bool) + Send + Sync>;

/// The signed-in session and its admin watch.
pub struct Session {
    local: Arc<LocalStore>,
    config: Arc<Config>,
    hooks: Arc<Mutex<Vec<AdminHook>>>,
    watch: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    pub fn new(local: Arc<LocalStore>, config: Arc<Config>) -> Self {
        Self {
            local,
            config,
            hooks: Arc::new(Mutex::new(Vec::new())),
            watch: Mutex::new(None),
        }
    }

    /// The cached sign-in record, if any.
    pub fn current_user(&self) -> Option<CachedUser> {
        identity::cached_user(&self.local)
    }

    /// Cache a sign-in record. The admin watch picks up the change on its
    /// next tick.
    pub fn sign_in(&self, user: &CachedUser) {
        identity::set_cached_user(&self.local, user);
    }

    /// Clear the cached record and tear down admin state immediately.
    pub fn sign_out(&self) {
        identity::clear_cached_user(&self.local);
        self.fire_hooks(false);
    }

    pub fn is_signed_in(&self) -> bool {
        identity::is_signed_in(&self.local)
    }

    /// Whether the cached email exactly equals the configured admin address.
    pub fn is_admin(&self) -> bool {
        identity::is_admin(&self.local, &self.config.admin_email)
    }

    /// Register a callback invoked with the new admin state whenever the
    /// signed-in email changes.
    pub fn on_admin_change(&self, hook: impl Fn(bool) + Send + Sync + 'static) {
        self.hooks.lock().expect("hook lock").push(Arc::new(hook));
    }

    /// Start the background watch comparing the cached email against the
    /// previously seen value on a fixed interval.
    pub fn start_watch(&self) {
        let mut slot = self.watch.lock().expect("watch lock");
        if slot.is_some() {
            return;
        }

        let local = Arc::clone(&self.local);
        let config = Arc::clone(&self.config);
        let hooks = Arc::clone(&self.hooks);

        *slot = Some(tokio::spawn(async move {
            let mut tracker = UserChangeTracker::new();
            let mut interval = tokio::time::interval(config.user_watch_interval);
            loop {
                interval.tick().await;
                let email = identity::cached_user(&local).and_then(|u| u.email);
                if tracker.observe(email.as_deref()) {
                    let admin = identity::is_admin(&local, &config.admin_email);
                    tracing::info!(admin, "signed-in user changed");
                    let hooks: Vec<AdminHook> =
                        hooks.lock().expect("hook lock").clone();
                    for hook in hooks {
                        hook(admin);
                    }
                }
            }
        }));
    }

    /// Stop the background watch.
    pub fn stop_watch(&self) {
        if let Some(task) = self.watch.lock().expect("watch lock").take() {
            task.abort();
        }
    }

    fn fire_hooks(&self, admin: bool) {
        let hooks: Vec<AdminHook> = self.hooks.lock().expect("hook lock").clone();
        for hook in hooks {
            hook(admin);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop_watch();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("signed_in", &self.is_signed_in())
            .finish_non_exhaustive()
    }
}
