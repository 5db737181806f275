//! Shipping addresses.
//!
//! Per-user list, upserted by id. Ids are derived from the save timestamp
//! when the caller did not provide one. The pull path replaces the whole
//! local list; the push path writes every address.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::keys;
use crate::local::LocalStore;

/// A shipping address. The fields themselves are free-form; this layer only
/// cares about identity and ownership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Identifier, generated from the save timestamp when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Owning user, set when the address is pushed remotely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Free-form address fields (name, street, city, ...)
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Address {
    /// Address with no id yet; one is assigned on save.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self {
            id: None,
            user_id: None,
            fields,
        }
    }
}

/// Load the user's addresses.
pub fn addresses(store: &LocalStore, user_id: &str) -> Vec<Address> {
    store.get(&keys::addresses(user_id))
}

/// Upsert an address by id, assigning a timestamp-derived id when absent.
/// Returns the saved address with its id filled in.
pub fn save_address(
    store: &LocalStore,
    user_id: &str,
    mut address: Address,
    now: DateTime<Utc>,
) -> Address {
    let id = address.id.unwrap_or_else(|| now.timestamp_millis());
    address.id = Some(id);

    let mut list = addresses(store, user_id);
    match list.iter_mut().find(|a| a.id == Some(id)) {
        Some(existing) => *existing = address.clone(),
        None => list.push(address.clone()),
    }
    store.set(&keys::addresses(user_id), &list);
    address
}

/// Delete an address by id.
pub fn delete_address(store: &LocalStore, user_id: &str, address_id: i64) {
    let mut list = addresses(store, user_id);
    list.retain(|a| a.id != Some(address_id));
    store.set(&keys::addresses(user_id), &list);
}

/// Replace the whole local list (explicit pull path).
pub fn replace_addresses(store: &LocalStore, user_id: &str, list: &[Address]) {
    store.set(&keys::addresses(user_id), list);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(street: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("street".into(), json!(street));
        map
    }

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn save_assigns_timestamp_id() {
        let store = LocalStore::in_memory();
        let saved = save_address(&store, "u1", Address::new(fields("1 Main St")), at(1_700_000));
        assert_eq!(saved.id, Some(1_700_000));
        assert_eq!(addresses(&store, "u1").len(), 1);
    }

    #[test]
    fn save_upserts_by_id() {
        let store = LocalStore::in_memory();
        let first = save_address(&store, "u1", Address::new(fields("1 Main St")), at(1000));

        let mut edited = first.clone();
        edited.fields = fields("2 Side St");
        save_address(&store, "u1", edited, at(2000));

        let list = addresses(&store, "u1");
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].fields["street"], "2 Side St");
        assert_eq!(list[0].id, first.id);
    }

    #[test]
    fn delete_removes_only_the_target() {
        let store = LocalStore::in_memory();
        let a = save_address(&store, "u1", Address::new(fields("A")), at(1000));
        save_address(&store, "u1", Address::new(fields("B")), at(2000));

        delete_address(&store, "u1", a.id.unwrap());
        let list = addresses(&store, "u1");
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].fields["street"], "B");
    }

    #[test]
    fn replace_is_wholesale() {
        let store = LocalStore::in_memory();
        save_address(&store, "u1", Address::new(fields("old")), at(1000));

        replace_addresses(&store, "u1", &[]);
        assert!(addresses(&store, "u1").is_empty());
    }
}
