//! Order lifecycle operations.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use cardforce_engine::{
    cart::CartItem,
    error::Result,
    order::{self, OrderStatus, OrderUpdate},
    refund, Order, OrderId, Refund,
};

use super::Storefront;
use crate::error::RemoteError;
use crate::notify;
use crate::sync::SyncOutcome;

impl Storefront {
    /// The local order list.
    pub fn orders(&self) -> Vec<Order> {
        order::orders(self.local())
    }

    /// One order by id.
    pub fn find_order(&self, id: OrderId) -> Option<Order> {
        order::find_order(self.local(), id)
    }

    /// The local refund list.
    pub fn refunds(&self) -> Vec<Refund> {
        refund::refunds(self.local())
    }

    /// Create an order from cart items and push it.
    ///
    /// Per-item prices come from the discount in effect right now; the
    /// total is the caller's number, stored untouched. If the remote store
    /// was not ready, the push is retried once after the configured delay.
    /// When the order opted into notifications, a confirmation is composed
    /// and handed off.
    pub async fn create_order(
        &self,
        items: Vec<CartItem>,
        total_price: f64,
        shipping_address: Option<Value>,
        email_notifications: bool,
    ) -> (Order, SyncOutcome) {
        let user = self.session().current_user();
        let placed = order::create_order(
            self.local(),
            user.as_ref(),
            items,
            total_price,
            shipping_address,
            email_notifications,
            Utc::now(),
        );
        tracing::info!(
            order = placed.id,
            number = %placed.order_number,
            total = placed.total_price,
            "order created"
        );

        let outcome = self.sync().push_order(&placed).await;
        if outcome == SyncOutcome::RemoteUnavailable {
            self.schedule_order_push_retry(placed.clone());
        }

        if placed.email_notifications {
            if let Some(email) = placed.user_email.as_deref() {
                self.notifier()
                    .deliver(notify::order_confirmation(email, &placed));
            }
        }

        (placed, outcome)
    }

    fn schedule_order_push_retry(&self, placed: Order) {
        let sync = Arc::clone(self.sync());
        let delay = self.config().order_push_retry_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let retried = sync.push_order(&placed).await;
            tracing::debug!(order = placed.id, ?retried, "deferred order push");
        });
    }

    /// Merge field updates into an order and push it.
    pub async fn update_order(
        &self,
        id: OrderId,
        update: OrderUpdate,
    ) -> Result<(Order, SyncOutcome)> {
        let updated = order::update_order(self.local(), id, update)?;
        let outcome = self.sync().push_order(&updated).await;
        Ok((updated, outcome))
    }

    /// Set an order's status with optional shipping metadata, composing the
    /// shipping notification when the order reaches `shipped` with carrier
    /// and tracking number present and notifications opted in.
    pub async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        shipping_company: Option<String>,
        tracking_number: Option<String>,
    ) -> Result<(Order, SyncOutcome)> {
        let updated =
            order::update_order_status(self.local(), id, status, shipping_company, tracking_number)?;

        if updated.shippable_notification() {
            // Checked by shippable_notification.
            let email = updated.user_email.as_deref().unwrap_or_default();
            let tracking = updated.tracking_number.as_deref().unwrap_or_default();
            let company = updated.shipping_company.as_deref().unwrap_or_default();
            self.notifier().deliver(notify::shipping_confirmation(
                email,
                &updated.order_number,
                tracking,
                company,
            ));
        }

        let outcome = self.sync().push_order(&updated).await;
        Ok((updated, outcome))
    }

    /// Cancel an order: terminal status, recorded reason, exactly one
    /// full-total refund, optional notifications, and pushes for both the
    /// order and the refund.
    pub async fn cancel_order(&self, id: OrderId, reason: &str) -> Result<(Order, SyncOutcome)> {
        let (cancelled, minted) = order::cancel_order(self.local(), id, reason, Utc::now())?;
        tracing::info!(order = cancelled.id, %reason, "order cancelled");

        let outcome = self.sync().push_order(&cancelled).await;

        if let Some(refund) = minted {
            self.sync().push_refund(&refund).await;
            if cancelled.email_notifications {
                if let Some(email) = cancelled.user_email.as_deref() {
                    self.notifier().deliver(notify::refund_notification(
                        email,
                        &cancelled.order_number,
                        refund.amount,
                        &refund.payment_method,
                    ));
                }
            }
        }

        if cancelled.email_notifications {
            if let Some(email) = cancelled.user_email.as_deref() {
                self.notifier().deliver(notify::order_cancellation(
                    email,
                    &cancelled.order_number,
                    reason,
                ));
            }
        }

        Ok((cancelled, outcome))
    }

    /// Remote order listing: the given user's orders, or every order
    /// newest-first. Not merged into the local list.
    pub async fn remote_orders(
        &self,
        user_id: Option<&str>,
    ) -> std::result::Result<Vec<Order>, RemoteError> {
        self.sync().pull_orders(user_id).await
    }
}
