//! Refresh-hook registry.
//!
//! Pages register their re-render callbacks here at startup; the sync
//! engine notifies the matching kind after applying remote state. This
//! replaces probing the host page for conveniently named functions - a
//! component that wants refreshing says so explicitly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

/// Which view a hook refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshKind {
    /// Cart re-render
    Cart,
    /// Catalog/listing re-render
    Catalog,
    /// Single-product page re-render
    Product,
}

/// Handle for unregistering a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookId(u64);

type Hook = Arc<dyn Fn() + Send + Sync>;

/// Registry of refresh callbacks, keyed by [`RefreshKind`].
#[derive(Default)]
pub struct RefreshHub {
    hooks: DashMap<RefreshKind, Vec<(HookId, Hook)>>,
    next_id: AtomicU64,
}

impl RefreshHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for `kind`; returns a handle for removal.
    pub fn register(&self, kind: RefreshKind, hook: impl Fn() + Send + Sync + 'static) -> HookId {
        let id = HookId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.hooks
            .entry(kind)
            .or_default()
            .push((id, Arc::new(hook)));
        id
    }

    /// Remove a previously registered callback.
    pub fn unregister(&self, kind: RefreshKind, id: HookId) {
        if let Some(mut hooks) = self.hooks.get_mut(&kind) {
            hooks.retain(|(hook_id, _)| *hook_id != id);
        }
    }

    /// Invoke every callback registered for `kind`; returns how many ran.
    pub fn notify(&self, kind: RefreshKind) -> usize {
        let hooks: Vec<Hook> = self
            .hooks
            .get(&kind)
            .map(|entry| entry.iter().map(|(_, hook)| Arc::clone(hook)).collect())
            .unwrap_or_default();

        for hook in &hooks {
            hook();
        }
        hooks.len()
    }

    /// Notify every product-related view (catalog, product, cart), the way
    /// a product-data refresh fans out across pages.
    pub fn notify_product_views(&self) {
        self.notify(RefreshKind::Catalog);
        self.notify(RefreshKind::Product);
        self.notify(RefreshKind::Cart);
    }
}

impl std::fmt::Debug for RefreshHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshHub")
            .field("kinds", &self.hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn notify_runs_matching_hooks_only() {
        let hub = RefreshHub::new();
        let cart_calls = Arc::new(AtomicUsize::new(0));
        let catalog_calls = Arc::new(AtomicUsize::new(0));

        let cart = Arc::clone(&cart_calls);
        hub.register(RefreshKind::Cart, move || {
            cart.fetch_add(1, Ordering::SeqCst);
        });
        let catalog = Arc::clone(&catalog_calls);
        hub.register(RefreshKind::Catalog, move || {
            catalog.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(hub.notify(RefreshKind::Cart), 1);
        assert_eq!(cart_calls.load(Ordering::SeqCst), 1);
        assert_eq!(catalog_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn notify_without_hooks_is_fine() {
        let hub = RefreshHub::new();
        assert_eq!(hub.notify(RefreshKind::Product), 0);
    }

    #[test]
    fn unregister_stops_invocations() {
        let hub = RefreshHub::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let id = hub.register(RefreshKind::Cart, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        hub.notify(RefreshKind::Cart);
        hub.unregister(RefreshKind::Cart, id);
        hub.notify(RefreshKind::Cart);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn product_views_fan_out() {
        let hub = RefreshHub::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for kind in [RefreshKind::Cart, RefreshKind::Catalog, RefreshKind::Product] {
            let counter = Arc::clone(&calls);
            hub.register(kind, move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        hub.notify_product_views();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
