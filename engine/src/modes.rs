//! Maintenance and "outdated site" page-mode state.
//!
//! Only the state lives here; rendering the maintenance screen or the
//! legacy skin is the host page's business. Enabling maintenance revokes
//! any prior admin unlock, so every admin re-authenticates per lockout.

use crate::keys;
use crate::local::LocalStore;

/// Whether maintenance mode is switched on.
pub fn maintenance_enabled(store: &LocalStore) -> bool {
    store.get(keys::MAINTENANCE_MODE)
}

/// Switch maintenance mode. Enabling clears the admin unlock flag.
pub fn set_maintenance_mode(store: &LocalStore, enabled: bool) {
    store.set(keys::MAINTENANCE_MODE, &enabled);
    if enabled {
        store.remove(keys::ADMIN_UNLOCKED);
    }
}

/// Whether an admin has unlocked the current session.
pub fn admin_unlocked(store: &LocalStore) -> bool {
    store.get(keys::ADMIN_UNLOCKED)
}

/// Mark the current session as admin-unlocked.
pub fn unlock_admin(store: &LocalStore) {
    store.set(keys::ADMIN_UNLOCKED, &true);
}

/// Whether the site should show the maintenance screen instead of content.
pub fn maintenance_blocked(store: &LocalStore) -> bool {
    maintenance_enabled(store) && !admin_unlocked(store)
}

/// Whether `email` may unlock a maintenance-locked site.
pub fn can_unlock(email: &str, maintenance_admins: &[String]) -> bool {
    maintenance_admins.iter().any(|admin| admin == email)
}

/// Whether the legacy "outdated site" skin is active.
pub fn outdated_mode(store: &LocalStore) -> bool {
    store.get(keys::OUTDATED_MODE)
}

/// Toggle the legacy skin flag.
pub fn set_outdated_mode(store: &LocalStore, enabled: bool) {
    store.set(keys::OUTDATED_MODE, &enabled);
}
