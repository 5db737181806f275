//! Cached sign-in identity and admin gating.
//!
//! The storefront caches the signed-in user's record locally and gates
//! admin features on an exact email match against one configured address.
//! This is advisory UI gating only - the actual authority is the remote
//! store's server-side rule set, which is outside this layer.

use serde::{Deserialize, Serialize};

use crate::keys;
use crate::local::LocalStore;

/// The locally cached sign-in record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedUser {
    /// Stable user id
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl CachedUser {
    /// Record with just an id and email.
    pub fn new(sub: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            email: Some(email.into()),
            name: None,
            picture: None,
        }
    }
}

/// The cached user, if a well-formed record is stored.
pub fn cached_user(store: &LocalStore) -> Option<CachedUser> {
    store.get_opt(keys::CACHED_USER)
}

/// Cache a sign-in record.
pub fn set_cached_user(store: &LocalStore, user: &CachedUser) {
    store.set(keys::CACHED_USER, user);
}

/// Drop the cached record (sign-out).
pub fn clear_cached_user(store: &LocalStore) {
    store.remove(keys::CACHED_USER);
}

/// Whether any user is cached.
pub fn is_signed_in(store: &LocalStore) -> bool {
    cached_user(store).is_some()
}

/// Whether the cached user's email exactly equals the admin address.
pub fn is_admin(store: &LocalStore, admin_email: &str) -> bool {
    cached_user(store)
        .and_then(|u| u.email)
        .is_some_and(|email| email == admin_email)
}

/// Detects changes to the cached user's email between observations.
///
/// Drives the admin-feature watch: whenever the email differs from the
/// previously seen value, admin setup is re-run.
#[derive(Debug, Default)]
pub struct UserChangeTracker {
    seen: Option<String>,
}

impl UserChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current email; returns whether it changed since the last
    /// observation.
    pub fn observe(&mut self, current: Option<&str>) -> bool {
        let current = current.map(str::to_owned);
        let changed = current != self.seen;
        self.seen = current;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: &str = "cardforcehelp@gmail.com";

    #[test]
    fn admin_requires_exact_email_match() {
        let store = LocalStore::in_memory();
        assert!(!is_admin(&store, ADMIN));

        set_cached_user(&store, &CachedUser::new("u1", "someone@example.com"));
        assert!(!is_admin(&store, ADMIN));

        set_cached_user(&store, &CachedUser::new("u2", ADMIN));
        assert!(is_admin(&store, ADMIN));

        // Case differences do not match.
        set_cached_user(&store, &CachedUser::new("u2", "CardForceHelp@gmail.com"));
        assert!(!is_admin(&store, ADMIN));
    }

    #[test]
    fn malformed_cache_reads_as_signed_out() {
        let store = LocalStore::in_memory();
        store.store_raw(keys::CACHED_USER, "{oops");
        assert!(cached_user(&store).is_none());
        assert!(!is_signed_in(&store));
        assert!(!is_admin(&store, ADMIN));
    }

    #[test]
    fn sign_out_clears_cache() {
        let store = LocalStore::in_memory();
        set_cached_user(&store, &CachedUser::new("u1", ADMIN));
        clear_cached_user(&store);
        assert!(!is_signed_in(&store));
    }

    #[test]
    fn tracker_reports_transitions_only() {
        let mut tracker = UserChangeTracker::new();

        // Signed out from the start: nothing changed.
        assert!(!tracker.observe(None));
        assert!(tracker.observe(Some("a@example.com")));
        assert!(!tracker.observe(Some("a@example.com")));
        assert!(tracker.observe(Some("b@example.com")));
        assert!(tracker.observe(None));
        assert!(!tracker.observe(None));
    }
}
