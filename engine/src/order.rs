//! Orders and the order lifecycle.
//!
//! Orders are created once at checkout and mutated in place afterwards;
//! they are never deleted. There is no enforced state machine - the admin
//! update path may set any status - but only the transition to `cancelled`
//! has side effects (refund creation, see [`cancel_order`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cart::CartItem;
use crate::error::{Error, Result};
use crate::identity::CachedUser;
use crate::keys;
use crate::local::LocalStore;
use crate::product::ProductBook;
use crate::refund::{create_refund, Refund};
use crate::OrderId;

/// Prefix for human-readable order numbers.
pub const ORDER_NUMBER_PREFIX: &str = "CF";

/// Order status.
///
/// Known states get variants; anything else round-trips through `Other`,
/// since the admin update path may set arbitrary status strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Shipped,
    Cancelled,
    Other(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Other(s) => s,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, OrderStatus::Cancelled)
    }

    pub fn is_shipped(&self) -> bool {
        matches!(self, OrderStatus::Shipped)
    }
}

impl From<&str> for OrderStatus {
    fn from(s: &str) -> Self {
        match s {
            "pending" => OrderStatus::Pending,
            "shipped" => OrderStatus::Shipped,
            "cancelled" => OrderStatus::Cancelled,
            other => OrderStatus::Other(other.to_owned()),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OrderStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OrderStatus {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(OrderStatus::from(s.as_str()))
    }
}

/// An order as stored locally and in the remote `orders` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Time-derived numeric id (milliseconds at creation)
    pub id: OrderId,
    /// Human-readable order number
    pub order_number: String,
    /// Owning user, null for guest checkouts
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    /// Line items with prices and custom-design payloads resolved at creation
    pub items: Vec<CartItem>,
    /// Caller-supplied total; intentionally not recomputed from the items
    pub total_price: f64,
    /// Snapshot of the shipping address as entered at checkout
    pub shipping_address: Option<Value>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub shipping_company: Option<String>,
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub email_notifications: bool,
    pub cancellation_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

impl Order {
    /// Whether a shipping notification can be composed for this order.
    pub fn shippable_notification(&self) -> bool {
        self.email_notifications
            && self.user_email.is_some()
            && self.status.is_shipped()
            && self.shipping_company.is_some()
            && self.tracking_number.is_some()
    }
}

/// Field updates merged into an order by the admin update path. `None`
/// fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub shipping_company: Option<String>,
    pub tracking_number: Option<String>,
    pub email_notifications: Option<bool>,
    pub payment_method: Option<String>,
}

/// Load the global order list.
pub fn orders(store: &LocalStore) -> Vec<Order> {
    store.get(keys::ORDERS)
}

/// Persist the global order list.
pub fn save_orders(store: &LocalStore, list: &[Order]) {
    store.set(keys::ORDERS, list);
}

/// Find one order by id.
pub fn find_order(store: &LocalStore, id: OrderId) -> Option<Order> {
    orders(store).into_iter().find(|o| o.id == id)
}

/// Create an order from cart items.
///
/// Per-item prices are resolved against the discount in effect right now
/// (not a snapshot taken when the item entered the cart), and items that
/// carry a custom design get their payload attached from the local store.
/// The total is taken from the caller as-is.
pub fn create_order(
    store: &LocalStore,
    user: Option<&CachedUser>,
    items: Vec<CartItem>,
    total_price: f64,
    shipping_address: Option<Value>,
    email_notifications: bool,
    now: DateTime<Utc>,
) -> Order {
    let book = ProductBook::load(store);
    let items = items
        .into_iter()
        .map(|item| resolve_item(store, &book, item))
        .collect();

    let id = now.timestamp_millis();
    let order = Order {
        id,
        order_number: order_number(id),
        user_id: user.map(|u| u.sub.clone()),
        user_email: user.and_then(|u| u.email.clone()),
        items,
        total_price,
        shipping_address,
        status: OrderStatus::Pending,
        created_at: now,
        shipping_company: None,
        tracking_number: None,
        email_notifications,
        cancellation_reason: None,
        cancelled_at: None,
        payment_method: None,
    };

    let mut list = orders(store);
    list.push(order.clone());
    save_orders(store, &list);
    order
}

fn resolve_item(store: &LocalStore, book: &ProductBook, mut item: CartItem) -> CartItem {
    if item.kind.as_deref() == Some(crate::cart::KIND_TRADING_CARD) {
        if let Some(card_id) = item.card_id.as_deref() {
            if let Some(discounted) = book.discounted_price(card_id) {
                item.price = discounted;
            }
        }
    }
    if item.is_custom() {
        item.custom_data = store.get_opt(&keys::custom_card(&item.id));
    }
    item
}

fn order_number(id: OrderId) -> String {
    let millis = id.to_string();
    let tail = &millis[millis.len().saturating_sub(6)..];
    format!("{ORDER_NUMBER_PREFIX}{tail}")
}

/// Merge field updates into an order. Returns the updated order.
pub fn update_order(store: &LocalStore, id: OrderId, update: OrderUpdate) -> Result<Order> {
    let mut list = orders(store);
    let order = list
        .iter_mut()
        .find(|o| o.id == id)
        .ok_or(Error::OrderNotFound(id))?;

    if let Some(status) = update.status {
        order.status = status;
    }
    if update.shipping_company.is_some() {
        order.shipping_company = update.shipping_company;
    }
    if update.tracking_number.is_some() {
        order.tracking_number = update.tracking_number;
    }
    if let Some(notify) = update.email_notifications {
        order.email_notifications = notify;
    }
    if update.payment_method.is_some() {
        order.payment_method = update.payment_method;
    }

    let updated = order.clone();
    save_orders(store, &list);
    Ok(updated)
}

/// Set an order's status, with optional shipping metadata.
pub fn update_order_status(
    store: &LocalStore,
    id: OrderId,
    status: OrderStatus,
    shipping_company: Option<String>,
    tracking_number: Option<String>,
) -> Result<Order> {
    update_order(
        store,
        id,
        OrderUpdate {
            status: Some(status),
            shipping_company,
            tracking_number,
            ..OrderUpdate::default()
        },
    )
}

/// Cancel an order and create its refund.
///
/// Terminal: cancelling an already-cancelled order is rejected, which is
/// also what guarantees at most one refund per order. The refund covers the
/// full total price; partial refunds do not exist at this layer.
pub fn cancel_order(
    store: &LocalStore,
    id: OrderId,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<(Order, Option<Refund>)> {
    let mut list = orders(store);
    let order = list
        .iter_mut()
        .find(|o| o.id == id)
        .ok_or(Error::OrderNotFound(id))?;

    if order.status.is_cancelled() {
        return Err(Error::OrderAlreadyCancelled(id));
    }

    order.status = OrderStatus::Cancelled;
    order.cancellation_reason = Some(reason.to_owned());
    order.cancelled_at = Some(now);

    let updated = order.clone();
    save_orders(store, &list);

    let refund = create_refund(store, &updated, now);
    Ok((updated, refund))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refund::refunds;
    use serde_json::json;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn trading_card_item(id: &str, price: f64) -> CartItem {
        let mut item = CartItem::new(id, format!("Card {id}"), price);
        item.kind = Some(crate::cart::KIND_TRADING_CARD.into());
        item.card_id = Some(id.to_owned());
        item
    }

    fn seed_product(store: &LocalStore, id: &str, price: f64, discount: f64) {
        let mut book = ProductBook::load(store);
        book.set_price(id, price);
        book.set_discount(id, discount);
        book.save(store);
    }

    #[test]
    fn order_number_uses_last_six_digits() {
        assert_eq!(order_number(1_700_123_456_789), "CF456789");
        assert_eq!(order_number(42), "CF42");
    }

    #[test]
    fn create_applies_discount_but_keeps_caller_total() {
        let store = LocalStore::in_memory();
        seed_product(&store, "x", 10.0, 50.0);

        let order = create_order(
            &store,
            None,
            vec![trading_card_item("x", 10.0)],
            10.0,
            Some(json!({"street": "1 Main St"})),
            false,
            at(1_700_000_000_000),
        );

        assert_eq!(order.items[0].price, 5.0);
        // Total is caller-supplied, deliberately not recomputed.
        assert_eq!(order.total_price, 10.0);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(orders(&store).len(), 1);
    }

    #[test]
    fn price_resolution_is_idempotent() {
        let store = LocalStore::in_memory();
        seed_product(&store, "x", 10.0, 30.0);

        let first = create_order(
            &store,
            None,
            vec![trading_card_item("x", 10.0)],
            10.0,
            None,
            false,
            at(1000),
        );
        let second = create_order(
            &store,
            None,
            vec![trading_card_item("x", 10.0)],
            10.0,
            None,
            false,
            at(2000),
        );

        assert_eq!(first.items[0].price, second.items[0].price);
        assert_eq!(first.items[0].price, 7.0);
    }

    #[test]
    fn zero_discount_leaves_item_price_alone() {
        let store = LocalStore::in_memory();
        seed_product(&store, "x", 10.0, 0.0);

        let order = create_order(
            &store,
            None,
            vec![trading_card_item("x", 8.0)],
            8.0,
            None,
            false,
            at(1000),
        );
        assert_eq!(order.items[0].price, 8.0);
    }

    #[test]
    fn custom_items_pick_up_their_design_payload() {
        let store = LocalStore::in_memory();
        store.set(&keys::custom_card("design-1"), &json!({"front": "dragon.png"}));

        let mut item = CartItem::new("design-1", "My Card", 15.0);
        item.kind = Some(crate::cart::KIND_CUSTOM.into());

        let order = create_order(&store, None, vec![item], 15.0, None, false, at(1000));
        assert_eq!(
            order.items[0].custom_data,
            Some(json!({"front": "dragon.png"}))
        );
    }

    #[test]
    fn create_captures_the_signed_in_user() {
        let store = LocalStore::in_memory();
        let user = CachedUser::new("u1", "buyer@example.com");

        let order = create_order(&store, Some(&user), vec![], 0.0, None, true, at(1000));
        assert_eq!(order.user_id.as_deref(), Some("u1"));
        assert_eq!(order.user_email.as_deref(), Some("buyer@example.com"));
        assert!(order.email_notifications);
    }

    #[test]
    fn status_update_merges_shipping_metadata() {
        let store = LocalStore::in_memory();
        let order = create_order(&store, None, vec![], 5.0, None, false, at(1000));

        let updated = update_order_status(
            &store,
            order.id,
            OrderStatus::Shipped,
            Some("UPS".into()),
            Some("1Z999".into()),
        )
        .unwrap();

        assert!(updated.status.is_shipped());
        assert_eq!(updated.shipping_company.as_deref(), Some("UPS"));
        assert_eq!(updated.tracking_number.as_deref(), Some("1Z999"));
    }

    #[test]
    fn any_status_string_is_representable() {
        let store = LocalStore::in_memory();
        let order = create_order(&store, None, vec![], 5.0, None, false, at(1000));

        let updated = update_order_status(
            &store,
            order.id,
            OrderStatus::from("awaiting-artwork"),
            None,
            None,
        )
        .unwrap();
        assert_eq!(updated.status.as_str(), "awaiting-artwork");

        let json = serde_json::to_value(&updated).unwrap();
        assert_eq!(json["status"], "awaiting-artwork");
    }

    #[test]
    fn update_missing_order_fails() {
        let store = LocalStore::in_memory();
        let err = update_order(&store, 404, OrderUpdate::default()).unwrap_err();
        assert_eq!(err, Error::OrderNotFound(404));
    }

    #[test]
    fn cancel_creates_exactly_one_full_refund() {
        let store = LocalStore::in_memory();
        let order = create_order(&store, None, vec![], 42.5, None, false, at(1000));

        let (cancelled, refund) = cancel_order(&store, order.id, "changed my mind", at(2000)).unwrap();
        assert!(cancelled.status.is_cancelled());
        assert_eq!(cancelled.cancellation_reason.as_deref(), Some("changed my mind"));
        assert_eq!(cancelled.cancelled_at, Some(at(2000)));

        let refund = refund.expect("first cancellation refunds");
        assert_eq!(refund.amount, 42.5);
        assert_eq!(refund.order_id, order.id);

        let err = cancel_order(&store, order.id, "again", at(3000)).unwrap_err();
        assert_eq!(err, Error::OrderAlreadyCancelled(order.id));
        assert_eq!(refunds(&store).len(), 1);
    }

    #[test]
    fn status_roundtrips_through_json() {
        for status in ["pending", "shipped", "cancelled", "on-hold"] {
            let parsed = OrderStatus::from(status);
            let json = serde_json::to_string(&parsed).unwrap();
            let back: OrderStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, back);
            assert_eq!(parsed.as_str(), status);
        }
    }
}
