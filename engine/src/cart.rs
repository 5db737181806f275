//! Cart line items.
//!
//! One active cart per user id, stored under `cart_{user}`. Saves replace
//! the whole list; there is no partial patch, and the remote listener
//! applies the same wholesale-replace policy (remote wins unconditionally).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::local::LocalStore;
use crate::keys;

/// Item kind marker for stock-backed trading cards.
pub const KIND_TRADING_CARD: &str = "trading-card";

/// Item kind marker for user-designed custom cards.
pub const KIND_CUSTOM: &str = "custom";

/// A single cart line item.
///
/// The same shape is reused for order line items; `create_order` resolves
/// the final price and attaches the custom-design payload at that point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Item identifier (product id or generated id for custom designs)
    pub id: String,
    /// Display name
    pub name: String,
    /// Unit price as placed in the cart
    pub price: f64,
    /// Quantity; absent means one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    /// Item kind ("trading-card", "custom", ...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Referenced product id for trading cards
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,
    /// Editor that produced a custom design, when applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor_type: Option<String>,
    /// Custom-design payload, resolved at order creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<Value>,
    /// Fields this layer does not interpret, preserved across saves
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CartItem {
    /// Minimal item with just id, name and price.
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            quantity: None,
            kind: None,
            card_id: None,
            editor_type: None,
            custom_data: None,
            extra: Map::new(),
        }
    }

    /// Whether this item carries (or should carry) a custom design.
    pub fn is_custom(&self) -> bool {
        self.kind.as_deref() == Some(KIND_CUSTOM) || self.editor_type.is_some()
    }
}

/// Load the user's cart. Absent or malformed carts read as empty.
pub fn cart_items(store: &LocalStore, user_id: &str) -> Vec<CartItem> {
    store.get(&keys::cart(user_id))
}

/// Replace the user's cart wholesale.
pub fn replace_cart(store: &LocalStore, user_id: &str, items: &[CartItem]) {
    store.set(&keys::cart(user_id), items);
}

/// Clear the user's cart.
pub fn clear_cart(store: &LocalStore, user_id: &str) {
    store.remove(&keys::cart(user_id));
}
