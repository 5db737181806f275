//! Error types for the Cardforce engine.

use crate::OrderId;
use thiserror::Error;

/// All possible errors from the Cardforce engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("order already cancelled: {0}")]
    OrderAlreadyCancelled(OrderId),

    #[error("conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("not signed in")]
    NotSignedIn,
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::OrderNotFound(1700000000000);
        assert_eq!(err.to_string(), "order not found: 1700000000000");

        let err = Error::ConversationNotFound("convo_1".into());
        assert_eq!(err.to_string(), "conversation not found: convo_1");
    }
}
