//! # Cardforce Engine
//!
//! Domain model and local-store logic for the Card Force storefront.
//!
//! This crate is the pure half of the sync layer: typed entities (cart,
//! product, stock, order, refund, address, conversation), the on-device
//! key-value store they persist into, and the per-entity merge policies the
//! sync engine applies when remote state arrives. It performs no IO and
//! never reads a clock - every mutation takes its timestamp from the
//! caller, which keeps id derivation and ordering fully deterministic.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine has no knowledge of the network or the platform
//! - **Caller-supplied time**: timestamps and time-derived ids are inputs
//! - **Forgiving reads**: malformed stored JSON reads as the default value
//! - **Per-entity merge policies**: cart is remote-wins wholesale, stock is
//!   field-overwrite per id, product data respects local tombstones. These
//!   deliberately stay divergent; behavior differences are relied upon
//!   elsewhere in the storefront.
//!
//! ## Core Concepts
//!
//! ### Local store
//!
//! [`LocalStore`] is a typed JSON view over a [`StorageBackend`] (an
//! in-memory backend ships with the crate). Keys are namespaced per entity
//! and per user - see [`keys`].
//!
//! ### Order lifecycle
//!
//! [`create_order`] resolves per-item discounts at call time and attaches
//! custom-design payloads; [`order::update_order_status`] merges shipping
//! metadata; [`cancel_order`] is terminal and creates exactly one
//! full-total [`Refund`].
//!
//! ## Quick Start
//!
//! ```rust
//! use cardforce_engine::{cart::CartItem, order, LocalStore, ProductBook};
//! use chrono::{DateTime, Utc};
//!
//! let store = LocalStore::in_memory();
//!
//! // Record a discounted product.
//! let mut book = ProductBook::load(&store);
//! book.set_price("mike", 10.0);
//! book.set_discount("mike", 50.0);
//! book.save(&store);
//!
//! // Check out a cart referencing it.
//! let mut item = CartItem::new("mike", "Mike", 10.0);
//! item.kind = Some("trading-card".into());
//! item.card_id = Some("mike".into());
//!
//! let now: DateTime<Utc> = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
//! let placed = order::create_order(&store, None, vec![item], 10.0, None, false, now);
//! assert_eq!(placed.items[0].price, 5.0);
//! ```

pub mod address;
pub mod cart;
pub mod error;
pub mod identity;
pub mod inbox;
pub mod keys;
pub mod local;
pub mod modes;
pub mod order;
pub mod product;
pub mod refund;
pub mod stock;

// Re-export main types at crate root
pub use cart::CartItem;
pub use error::Error;
pub use identity::{CachedUser, UserChangeTracker};
pub use inbox::{Conversation, Message, SenderRole};
pub use local::{LocalStore, MemoryBackend, StorageBackend};
pub use order::{cancel_order, create_order, Order, OrderStatus, OrderUpdate};
pub use product::{Product, ProductBook, ProductChange};
pub use refund::Refund;
pub use stock::StockMap;

/// Type aliases for clarity
pub type ProductId = String;
pub type UserId = String;
pub type OrderId = i64;
