//! # Cardforce Client
//!
//! Storefront sync client for Card Force: glue between the on-device
//! [`LocalStore`](cardforce_engine::LocalStore) and a remote document
//! store, plus the domain operations (order lifecycle, catalog and stock
//! mutation, support inbox) that ride on it.
//!
//! The [`Storefront`] context object owns everything with an explicit
//! start/stop lifecycle:
//!
//! - [`remote::RemoteStore`] - async CRUD + subscriptions over the fixed
//!   document collections; in-memory and HTTP-polling implementations ship
//!   with the crate
//! - [`sync::SyncEngine`] - per-entity push/pull with the storefront's
//!   divergent merge policies (remote-wins cart, field-overwrite stock,
//!   tombstone-respecting products), reporting a [`sync::SyncOutcome`] per
//!   operation instead of throwing
//! - [`session::Session`] - cached identity, admin gating, and the
//!   background watch re-running admin setup when the signed-in user
//!   changes
//! - [`notify`] - notification composition handed off to a
//!   [`notify::Notifier`] collaborator
//! - [`sync::refresh::RefreshHub`] - explicit registry where pages register
//!   their re-render callbacks
//!
//! Remote failures never unwind a local mutation: local state simply runs
//! ahead until the next successful sync trigger.

pub mod config;
pub mod error;
pub mod modes;
pub mod notify;
pub mod remote;
pub mod session;
pub mod storefront;
pub mod sync;

pub use config::{Config, ConfigError};
pub use error::RemoteError;
pub use modes::PageModes;
pub use notify::{EmailMessage, LogNotifier, Notifier};
pub use remote::{
    ChangeKind, Collection, Direction, Document, HttpRemote, MemoryRemote, Query, RemoteChange,
    RemoteStore,
};
pub use session::Session;
pub use storefront::Storefront;
pub use sync::refresh::{HookId, RefreshHub, RefreshKind};
pub use sync::{SyncEngine, SyncOutcome};

/// Initialize tracing for binaries embedding the client. Reads the usual
/// `RUST_LOG` filter, defaulting to info-level client logs.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardforce_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
