//! Notification composition and hand-off.
//!
//! The storefront composes subject/body for order confirmation, shipping,
//! cancellation and refund events, then hands the message to a [`Notifier`].
//! Delivery is an external collaborator: a mail relay, or the user's own
//! mail client via [`mailto_url`]. Hand-off is fire-and-forget - nothing
//! here waits on delivery.

use cardforce_engine::Order;

/// A composed notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivery collaborator. Implementations must not block the caller on
/// actual delivery.
pub trait Notifier: Send + Sync {
    fn deliver(&self, message: EmailMessage);
}

/// Notifier that records the hand-off in the log and drops the message.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn deliver(&self, message: EmailMessage) {
        tracing::info!(to = %message.to, subject = %message.subject, "notification composed");
    }
}

/// Order confirmation, sent right after checkout when the order opted in.
pub fn order_confirmation(to: &str, order: &Order) -> EmailMessage {
    let items = order
        .items
        .iter()
        .map(|item| format!("- {}: ${:.2}", item.name, item.price))
        .collect::<Vec<_>>()
        .join("\n");

    EmailMessage {
        to: to.to_owned(),
        subject: format!("Order Confirmation - {}", order.order_number),
        body: format!(
            "Order Confirmation\n\n\
             Thank you for your order!\n\n\
             Order Number: {}\n\
             Total: ${:.2}\n\n\
             Items:\n{}\n\n\
             We'll process your order and send you updates via email.\n\n\
             Thank you for choosing Card Force!\n\n\
             Best regards,\n\
             Card Force Team",
            order.order_number, order.total_price, items
        ),
    }
}

/// Shipping confirmation, sent when an opted-in order reaches `shipped`
/// with both carrier and tracking number present.
pub fn shipping_confirmation(
    to: &str,
    order_number: &str,
    tracking_number: &str,
    shipping_company: &str,
) -> EmailMessage {
    EmailMessage {
        to: to.to_owned(),
        subject: format!("Your Order Has Shipped - {order_number}"),
        body: format!(
            "Shipping Confirmation\n\n\
             Great news! Your order has shipped.\n\n\
             Order Number: {order_number}\n\
             Tracking Number: {tracking_number}\n\
             Shipping Company: {shipping_company}\n\n\
             You can track your package using the tracking number above.\n\n\
             Thank you for your order!\n\n\
             Best regards,\n\
             Card Force Team"
        ),
    }
}

/// Cancellation notice.
pub fn order_cancellation(to: &str, order_number: &str, reason: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_owned(),
        subject: format!("Order Cancelled - {order_number}"),
        body: format!(
            "Order Cancellation Notice\n\n\
             Your order has been cancelled.\n\n\
             Order Number: {order_number}\n\
             Cancellation Reason: {reason}\n\n\
             If you have any questions, please contact us.\n\n\
             Best regards,\n\
             Card Force Team"
        ),
    }
}

/// Refund notice, sent alongside the cancellation when a refund is minted.
pub fn refund_notification(
    to: &str,
    order_number: &str,
    amount: f64,
    payment_method: &str,
) -> EmailMessage {
    EmailMessage {
        to: to.to_owned(),
        subject: format!("Refund Processed - Order {order_number}"),
        body: format!(
            "Refund Notification\n\n\
             Your refund has been processed for the following order:\n\n\
             Order Number: {order_number}\n\
             Refund Amount: ${amount:.2}\n\
             Payment Method: {}\n\n\
             The refund will appear in your account within 3-5 business days, \
             depending on your payment method.\n\n\
             If you have any questions about this refund, please contact us.\n\n\
             Thank you for your understanding.\n\n\
             Best regards,\n\
             Card Force Team",
            payment_method.to_uppercase()
        ),
    }
}

/// Render a message as a `mailto:` URL for the user's-own-mail-client path.
pub fn mailto_url(message: &EmailMessage) -> String {
    format!(
        "mailto:{}?subject={}&body={}",
        message.to,
        percent_encode(&message.subject),
        percent_encode(&message.body)
    )
}

/// Percent-encode everything outside the unreserved set.
fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            other => {
                out.push_str(&format!("%{other:02X}"));
            }
        }
    }
    out
}
