//! Local-store key namespace.
//!
//! Every value the storefront persists on-device lives under one of these
//! keys. Per-user data is namespaced by the user's stable id so switching
//! accounts on the same device never mixes state.

/// Flat product-data map, keyed by product id.
pub const PRODUCT_DATA: &str = "productData";

/// Admin-curated product catalog list.
pub const PRODUCT_CATALOG: &str = "productCatalog";

/// Stock counts, keyed by product id.
pub const STOCK_DATA: &str = "stockData";

/// Global order list.
pub const ORDERS: &str = "orders";

/// Global refund list.
pub const REFUNDS: &str = "refunds";

/// Global conversation list for the support inbox.
pub const CONVERSATIONS: &str = "cf_messages_conversations";

/// Cached sign-in record for the current user.
pub const CACHED_USER: &str = "googleUser";

/// Maintenance-mode flag.
pub const MAINTENANCE_MODE: &str = "maintenanceMode";

/// Session flag set once an admin has unlocked a maintenance-locked site.
pub const ADMIN_UNLOCKED: &str = "adminUnlocked";

/// Session flag for the legacy "outdated site" skin.
pub const OUTDATED_MODE: &str = "outdatedMode";

/// Per-user cart key.
pub fn cart(user_id: &str) -> String {
    format!("cart_{user_id}")
}

/// Per-user address list key.
pub fn addresses(user_id: &str) -> String {
    format!("addresses_{user_id}")
}

/// Per-user saved-design list key.
pub fn saved_designs(user_id: &str) -> String {
    format!("savedDesigns_{user_id}")
}

/// Custom-design payload for a single cart item.
pub fn custom_card(item_id: &str) -> String {
    format!("customCardData_{item_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_user_keys() {
        assert_eq!(cart("u1"), "cart_u1");
        assert_eq!(addresses("u1"), "addresses_u1");
        assert_eq!(saved_designs("u1"), "savedDesigns_u1");
        assert_eq!(custom_card("item-9"), "customCardData_item-9");
    }
}
