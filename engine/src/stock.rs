//! Stock counts.
//!
//! A flat map from product id to a non-negative quantity. Decrements clamp
//! at zero. The pull merge is field-overwrite per id: every id present
//! remotely replaces the local value, ids absent remotely are untouched, so
//! the pull path can never delete a local-only stock entry.

use std::collections::BTreeMap;

use crate::keys;
use crate::local::LocalStore;

/// Stock quantities keyed by product id.
pub type StockMap = BTreeMap<String, u32>;

/// Load the full stock map.
pub fn stock_map(store: &LocalStore) -> StockMap {
    store.get(keys::STOCK_DATA)
}

/// Current stock for one item, zero when unknown.
pub fn get_stock(store: &LocalStore, item_id: &str) -> u32 {
    stock_map(store).get(item_id).copied().unwrap_or(0)
}

/// Set the stock for one item.
pub fn update_stock(store: &LocalStore, item_id: &str, quantity: u32) {
    let mut stock = stock_map(store);
    stock.insert(item_id.to_owned(), quantity);
    store.set(keys::STOCK_DATA, &stock);
}

/// Reduce stock for one item, clamping at zero. Returns the new quantity.
pub fn reduce_stock(store: &LocalStore, item_id: &str, amount: u32) -> u32 {
    let remaining = get_stock(store, item_id).saturating_sub(amount);
    update_stock(store, item_id, remaining);
    remaining
}

/// Field-overwrite merge of a remotely loaded stock map.
pub fn merge_remote_stock(store: &LocalStore, remote: &StockMap) {
    let mut stock = stock_map(store);
    for (item_id, quantity) in remote {
        stock.insert(item_id.clone(), *quantity);
    }
    store.set(keys::STOCK_DATA, &stock);
}

/// Seed initial stock for items that have no entry yet.
pub fn seed_stock(store: &LocalStore, seeds: &[(String, u32)]) {
    let mut stock = stock_map(store);
    for (item_id, quantity) in seeds {
        stock.entry(item_id.clone()).or_insert(*quantity);
    }
    store.set(keys::STOCK_DATA, &stock);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn unknown_items_have_zero_stock() {
        let store = LocalStore::in_memory();
        assert_eq!(get_stock(&store, "mike"), 0);
    }

    #[test]
    fn reduce_clamps_at_zero() {
        let store = LocalStore::in_memory();
        update_stock(&store, "mike", 30);

        assert_eq!(reduce_stock(&store, "mike", 5), 25);
        assert_eq!(get_stock(&store, "mike"), 25);

        assert_eq!(reduce_stock(&store, "mike", 100), 0);
        assert_eq!(get_stock(&store, "mike"), 0);
    }

    #[test]
    fn merge_overwrites_present_ids_only() {
        let store = LocalStore::in_memory();
        update_stock(&store, "mike", 30);
        update_stock(&store, "local-only", 7);

        let remote = StockMap::from([("mike".to_owned(), 12), ("pig-princess".to_owned(), 50)]);
        merge_remote_stock(&store, &remote);

        assert_eq!(get_stock(&store, "mike"), 12);
        assert_eq!(get_stock(&store, "pig-princess"), 50);
        // Absent remotely, untouched locally.
        assert_eq!(get_stock(&store, "local-only"), 7);
    }

    #[test]
    fn seeding_never_overwrites() {
        let store = LocalStore::in_memory();
        update_stock(&store, "mike", 3);

        seed_stock(
            &store,
            &[("mike".to_owned(), 30), ("pig-princess".to_owned(), 50)],
        );

        assert_eq!(get_stock(&store, "mike"), 3);
        assert_eq!(get_stock(&store, "pig-princess"), 50);
    }

    proptest! {
        #[test]
        fn stock_never_goes_negative(
            initial in 0u32..1000,
            reductions in proptest::collection::vec(0u32..500, 0..20),
        ) {
            let store = LocalStore::in_memory();
            update_stock(&store, "item", initial);

            let mut expected = initial;
            for amount in reductions {
                expected = expected.saturating_sub(amount);
                prop_assert_eq!(reduce_stock(&store, "item", amount), expected);
            }
            prop_assert_eq!(get_stock(&store, "item"), expected);
        }
    }
}
