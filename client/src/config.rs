//! Configuration management for the storefront client.

use std::env;
use std::time::Duration;

/// Storefront admin address used by default when none is configured.
pub const DEFAULT_ADMIN_EMAIL: &str = "cardforcehelp@gmail.com";

/// Addresses allowed to unlock a maintenance-locked site by default.
pub const DEFAULT_MAINTENANCE_ADMINS: [&str; 3] = [
    "cardforcehelp@gmail.com",
    "imsongbo@gmail.com",
    "isaacjinxi@gmail.com",
];

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// The one address whose session gets admin features
    pub admin_email: String,
    /// Addresses that may unlock a maintenance-locked site
    pub maintenance_admins: Vec<String>,
    /// Base URL of the remote document store, when HTTP-backed
    pub remote_url: Option<String>,
    /// Delay before the cart listener attaches after start
    pub cart_listener_delay: Duration,
    /// Delay before the initial stock pull after start
    pub stock_pull_delay: Duration,
    /// Delay before retrying an order push that found the remote not ready
    pub order_push_retry_delay: Duration,
    /// Poll interval of the signed-in-user watch
    pub user_watch_interval: Duration,
    /// Initial stock counts seeded for items with no entry yet
    pub stock_seeds: Vec<(String, u32)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            admin_email: DEFAULT_ADMIN_EMAIL.to_owned(),
            maintenance_admins: DEFAULT_MAINTENANCE_ADMINS
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            remote_url: None,
            cart_listener_delay: Duration::from_secs(2),
            stock_pull_delay: Duration::from_secs(3),
            order_push_retry_delay: Duration::from_secs(2),
            user_watch_interval: Duration::from_secs(1),
            stock_seeds: vec![("pig-princess".to_owned(), 50), ("mike".to_owned(), 30)],
        }
    }
}

impl Config {
    /// Load configuration from the environment (and `.env`, if present),
    /// falling back to the defaults above for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();

        if let Ok(admin) = env::var("CARDFORCE_ADMIN_EMAIL") {
            config.admin_email = admin;
        }
        if let Ok(admins) = env::var("CARDFORCE_MAINTENANCE_ADMINS") {
            config.maintenance_admins = admins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect();
        }
        config.remote_url = env::var("CARDFORCE_REMOTE_URL").ok();

        config.cart_listener_delay =
            delay_from_env("CARDFORCE_CART_LISTENER_DELAY_MS", config.cart_listener_delay)?;
        config.stock_pull_delay =
            delay_from_env("CARDFORCE_STOCK_PULL_DELAY_MS", config.stock_pull_delay)?;
        config.order_push_retry_delay = delay_from_env(
            "CARDFORCE_ORDER_RETRY_DELAY_MS",
            config.order_push_retry_delay,
        )?;
        config.user_watch_interval =
            delay_from_env("CARDFORCE_USER_WATCH_INTERVAL_MS", config.user_watch_interval)?;

        Ok(config)
    }

    /// A config with every delay zeroed, for tests that drive time manually.
    pub fn immediate() -> Self {
        Self {
            cart_listener_delay: Duration::ZERO,
            stock_pull_delay: Duration::ZERO,
            order_push_retry_delay: Duration::ZERO,
            user_watch_interval: Duration::from_millis(10),
            ..Self::default()
        }
    }
}

fn delay_from_env(name: &str, default: Duration) -> Result<Duration, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::InvalidDelay(name.to_owned())),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid millisecond value for {0}")]
    InvalidDelay(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_storefront() {
        let config = Config::default();
        assert_eq!(config.admin_email, DEFAULT_ADMIN_EMAIL);
        assert_eq!(config.maintenance_admins.len(), 3);
        assert_eq!(config.cart_listener_delay, Duration::from_secs(2));
        assert_eq!(config.stock_pull_delay, Duration::from_secs(3));
        assert!(config
            .stock_seeds
            .iter()
            .any(|(id, qty)| id == "mike" && *qty == 30));
    }

    #[test]
    fn immediate_zeroes_the_sync_delays() {
        let config = Config::immediate();
        assert_eq!(config.cart_listener_delay, Duration::ZERO);
        assert_eq!(config.stock_pull_delay, Duration::ZERO);
        assert_eq!(config.order_push_retry_delay, Duration::ZERO);
    }
}
