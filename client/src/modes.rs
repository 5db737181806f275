//! Maintenance and "outdated site" page modes.
//!
//! State only; the maintenance screen and the legacy skin themselves are
//! rendered by the host pages. Unlocking a maintenance-locked site requires
//! an email on the configured maintenance-admin list, which is deliberately
//! broader than the single storefront admin address.

use std::sync::Arc;

use cardforce_engine::{modes, LocalStore};

use crate::config::Config;

/// Page-mode state over the local store.
#[derive(Debug)]
pub struct PageModes {
    local: Arc<LocalStore>,
    config: Arc<Config>,
}

impl PageModes {
    pub fn new(local: Arc<LocalStore>, config: Arc<Config>) -> Self {
        Self { local, config }
    }

    /// Whether maintenance mode is switched on.
    pub fn maintenance_enabled(&self) -> bool {
        modes::maintenance_enabled(&self.local)
    }

    /// Switch maintenance mode; enabling revokes any prior admin unlock.
    pub fn set_maintenance_mode(&self, enabled: bool) {
        modes::set_maintenance_mode(&self.local, enabled);
        tracing::info!(enabled, "maintenance mode toggled");
    }

    /// Whether content should be replaced by the maintenance screen.
    pub fn maintenance_blocked(&self) -> bool {
        modes::maintenance_blocked(&self.local)
    }

    /// Try to unlock the maintenance-locked site for this session.
    /// Succeeds only for emails on the maintenance-admin list.
    pub fn unlock_with(&self, email: &str) -> bool {
        if !modes::can_unlock(email, &self.config.maintenance_admins) {
            tracing::info!(%email, "maintenance unlock refused");
            return false;
        }
        modes::unlock_admin(&self.local);
        tracing::info!(%email, "maintenance unlocked");
        true
    }

    /// Whether the legacy "outdated site" skin is active.
    pub fn outdated_mode(&self) -> bool {
        modes::outdated_mode(&self.local)
    }

    /// Toggle the legacy skin flag.
    pub fn set_outdated_mode(&self, enabled: bool) {
        modes::set_outdated_mode(&self.local, enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_modes() -> PageModes {
        PageModes::new(
            Arc::new(LocalStore::in_memory()),
            Arc::new(Config::default()),
        )
    }

    #[test]
    fn unlock_requires_listed_email() {
        let modes = page_modes();
        modes.set_maintenance_mode(true);
        assert!(modes.maintenance_blocked());

        assert!(!modes.unlock_with("visitor@example.com"));
        assert!(modes.maintenance_blocked());

        assert!(modes.unlock_with("imsongbo@gmail.com"));
        assert!(!modes.maintenance_blocked());
    }

    #[test]
    fn re_enabling_relocks() {
        let modes = page_modes();
        modes.set_maintenance_mode(true);
        assert!(modes.unlock_with("cardforcehelp@gmail.com"));

        modes.set_maintenance_mode(true);
        assert!(modes.maintenance_blocked());
    }

    #[test]
    fn outdated_skin_toggle() {
        let modes = page_modes();
        assert!(!modes.outdated_mode());
        modes.set_outdated_mode(true);
        assert!(modes.outdated_mode());
    }
}
