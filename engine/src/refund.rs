//! Refund records.
//!
//! Refunds exist only as a side effect of order cancellation: one refund
//! per cancelled order, covering the full total price, append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::keys;
use crate::local::LocalStore;
use crate::order::Order;
use crate::OrderId;

/// Payment method recorded when the order never captured one.
pub const DEFAULT_PAYMENT_METHOD: &str = "paypal";

/// Initial refund status.
pub const REFUND_STATUS_PENDING: &str = "pending";

/// A refund record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Refund {
    /// Time-derived numeric id
    pub id: i64,
    pub order_id: OrderId,
    pub order_number: String,
    /// Always the order's full total price
    pub amount: f64,
    pub payment_method: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub reason: String,
}

/// Load the global refund list.
pub fn refunds(store: &LocalStore) -> Vec<Refund> {
    store.get(keys::REFUNDS)
}

/// Persist the global refund list.
pub fn save_refunds(store: &LocalStore, list: &[Refund]) {
    store.set(keys::REFUNDS, list);
}

/// The refund for an order, if one was already created.
pub fn refund_for_order(store: &LocalStore, order_id: OrderId) -> Option<Refund> {
    refunds(store).into_iter().find(|r| r.order_id == order_id)
}

/// Create the refund for a cancelled order.
///
/// Returns `None` when a refund for this order id already exists - the
/// duplicate guard that keeps cancellation idempotent on the refund side.
pub fn create_refund(store: &LocalStore, order: &Order, now: DateTime<Utc>) -> Option<Refund> {
    let mut list = refunds(store);
    if list.iter().any(|r| r.order_id == order.id) {
        return None;
    }

    let refund = Refund {
        id: now.timestamp_millis(),
        order_id: order.id,
        order_number: order.order_number.clone(),
        amount: order.total_price,
        payment_method: order
            .payment_method
            .clone()
            .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_owned()),
        status: REFUND_STATUS_PENDING.to_owned(),
        created_at: now,
        reason: order
            .cancellation_reason
            .clone()
            .unwrap_or_else(|| "Order cancelled".to_owned()),
    };

    list.push(refund.clone());
    save_refunds(store, &list);
    Some(refund)
}
