//! Product data and catalog.
//!
//! Products live in two overlapping representations that are kept
//! consistent: a flat map keyed by id (the "product data" used for price,
//! discount and availability lookups) and an ordered list (the
//! admin-curated "catalog"). Local absence of an id acts as a tombstone:
//! explicit pulls never resurrect a locally removed product. The live
//! subscription path is the one exception - it is allowed to insert new
//! ids and is the only path through which a remote removal propagates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::keys;
use crate::local::LocalStore;

/// Availability status used when a product has none recorded.
pub const STATUS_AVAILABLE: &str = "Available";

/// A product, as stored in the data map, the catalog and the remote store.
///
/// Every descriptive field is optional because data-map entries can be
/// partial - a product that has only ever had its status set is stored as a
/// status-only record. Unknown remote fields ride along in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Discount percent, 0-100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Lead time in days when the product is on backorder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backorder_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    /// A product record carrying nothing but its id.
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            price: None,
            discount: None,
            status: None,
            backorder_days: None,
            stock: None,
            extra: Map::new(),
        }
    }

    /// Field-level merge: every field the other record carries overrides
    /// this one; fields it lacks are kept.
    pub fn merge_from(&mut self, other: &Product) {
        if other.name.is_some() {
            self.name = other.name.clone();
        }
        if other.price.is_some() {
            self.price = other.price;
        }
        if other.discount.is_some() {
            self.discount = other.discount;
        }
        if other.status.is_some() {
            self.status = other.status.clone();
        }
        if other.backorder_days.is_some() {
            self.backorder_days = other.backorder_days;
        }
        if other.stock.is_some() {
            self.stock = other.stock;
        }
        for (key, value) in &other.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }

    /// Unit price with the current discount applied, when both are known
    /// and the discount is actually positive.
    pub fn discounted_price(&self) -> Option<f64> {
        match (self.price, self.discount) {
            (Some(price), Some(discount)) if discount > 0.0 => {
                Some(price * (1.0 - discount / 100.0))
            }
            _ => None,
        }
    }
}

/// A change delivered by the live products subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductChange {
    /// Added or modified remotely - upsert into both representations.
    Upsert(Product),
    /// Removed remotely - delete from both representations.
    Remove(String),
}

/// The two product representations, loaded and saved together so the
/// catalog/data consistency invariant holds across every mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductBook {
    data: BTreeMap<String, Product>,
    catalog: Vec<Product>,
}

impl ProductBook {
    /// Load both representations from the local store.
    pub fn load(store: &LocalStore) -> Self {
        Self {
            data: store.get(keys::PRODUCT_DATA),
            catalog: store.get(keys::PRODUCT_CATALOG),
        }
    }

    /// Persist both representations.
    pub fn save(&self, store: &LocalStore) {
        store.set(keys::PRODUCT_DATA, &self.data);
        store.set(keys::PRODUCT_CATALOG, &self.catalog);
    }

    /// The flat data map.
    pub fn data(&self) -> &BTreeMap<String, Product> {
        &self.data
    }

    /// The catalog list, in admin-curated order.
    pub fn catalog(&self) -> &[Product] {
        &self.catalog
    }

    /// Look up a product in the data map.
    pub fn get(&self, id: &str) -> Option<&Product> {
        self.data.get(id)
    }

    /// Availability status, defaulting to [`STATUS_AVAILABLE`].
    pub fn status(&self, id: &str) -> String {
        self.data
            .get(id)
            .and_then(|p| p.status.clone())
            .unwrap_or_else(|| STATUS_AVAILABLE.to_owned())
    }

    /// Set the availability status, creating a partial entry if needed.
    pub fn set_status(&mut self, id: &str, status: &str, backorder_days: Option<u32>) {
        let entry = self.entry(id);
        entry.status = Some(status.to_owned());
        if backorder_days.is_some() {
            entry.backorder_days = backorder_days;
        }
    }

    /// Discount percent, defaulting to zero.
    pub fn discount(&self, id: &str) -> f64 {
        self.data.get(id).and_then(|p| p.discount).unwrap_or(0.0)
    }

    /// Set the discount percent.
    pub fn set_discount(&mut self, id: &str, discount: f64) {
        self.entry(id).discount = Some(discount);
    }

    /// Base price, if one is recorded.
    pub fn price(&self, id: &str) -> Option<f64> {
        self.data.get(id).and_then(|p| p.price)
    }

    /// Set the base price.
    pub fn set_price(&mut self, id: &str, price: f64) {
        self.entry(id).price = Some(price);
    }

    /// Unit price for `id` with any current discount applied.
    pub fn discounted_price(&self, id: &str) -> Option<f64> {
        self.data.get(id).and_then(Product::discounted_price)
    }

    /// Upsert a product into both representations.
    pub fn upsert(&mut self, product: Product) {
        match self.catalog.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => existing.merge_from(&product),
            None => self.catalog.push(product.clone()),
        }
        self.entry(&product.id.clone()).merge_from(&product);
    }

    /// Remove a product from both representations. Local absence is the
    /// tombstone that keeps explicit pulls from resurrecting it.
    pub fn remove(&mut self, id: &str) {
        self.data.remove(id);
        self.catalog.retain(|p| p.id != id);
    }

    /// Tombstone-respecting pull merge.
    ///
    /// A remote product is merged only when its id already exists in the
    /// local data map (a present-but-empty entry counts); everything else
    /// is skipped so deletions stick. Returns the ids that were merged.
    pub fn merge_remote(&mut self, remote: impl IntoIterator<Item = Product>) -> Vec<String> {
        let mut merged = Vec::new();
        for product in remote {
            let Some(local) = self.data.get_mut(&product.id) else {
                continue;
            };
            local.merge_from(&product);

            match self.catalog.iter_mut().find(|p| p.id == product.id) {
                Some(existing) => existing.merge_from(&product),
                None => self.catalog.push(product.clone()),
            }
            merged.push(product.id);
        }
        merged
    }

    /// Apply one live-subscription change to both representations.
    pub fn apply_change(&mut self, change: ProductChange) {
        match change {
            ProductChange::Upsert(product) => self.upsert(product),
            ProductChange::Remove(id) => self.remove(&id),
        }
    }

    /// Every catalog id has a data entry and vice versa.
    pub fn is_consistent(&self) -> bool {
        self.catalog.iter().all(|p| self.data.contains_key(&p.id))
            && self
                .data
                .keys()
                .all(|id| self.catalog.iter().any(|p| &p.id == id))
    }

    fn entry(&mut self, id: &str) -> &mut Product {
        if !self.catalog.iter().any(|p| p.id == id) {
            self.catalog.push(Product::empty(id));
        }
        self.data
            .entry(id.to_owned())
            .or_insert_with(|| Product::empty(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: &str, price: f64) -> Product {
        Product {
            name: Some(format!("Card {id}")),
            price: Some(price),
            ..Product::empty(id)
        }
    }

    #[test]
    fn discount_roundtrip() {
        let mut book = ProductBook::default();
        book.set_discount("mike", 25.0);
        assert_eq!(book.discount("mike"), 25.0);
        assert_eq!(book.discount("unknown"), 0.0);
    }

    #[test]
    fn status_defaults_to_available() {
        let mut book = ProductBook::default();
        assert_eq!(book.status("mike"), STATUS_AVAILABLE);

        book.set_status("mike", "Backorder", Some(14));
        assert_eq!(book.status("mike"), "Backorder");
        assert_eq!(book.get("mike").unwrap().backorder_days, Some(14));
    }

    #[test]
    fn partial_entries_keep_book_consistent() {
        let mut book = ProductBook::default();
        book.set_price("mike", 12.0);
        book.set_discount("pig-princess", 10.0);
        assert!(book.is_consistent());
    }

    #[test]
    fn discounted_price() {
        let mut book = ProductBook::default();
        book.upsert(card("x", 10.0));
        assert_eq!(book.discounted_price("x"), None);

        book.set_discount("x", 50.0);
        assert_eq!(book.discounted_price("x"), Some(5.0));

        // Price-less entries cannot produce a discounted price.
        book.set_discount("ghost", 50.0);
        assert_eq!(book.discounted_price("ghost"), None);
    }

    #[test]
    fn merge_remote_respects_tombstones() {
        let mut book = ProductBook::default();
        book.upsert(card("a", 1.0));

        let merged = book.merge_remote(vec![card("a", 2.0), card("b", 3.0)]);

        assert_eq!(merged, vec!["a".to_owned()]);
        assert_eq!(book.price("a"), Some(2.0));
        // "b" was never present locally, so the pull must not introduce it.
        assert!(book.get("b").is_none());
        assert!(!book.catalog().iter().any(|p| p.id == "b"));
    }

    #[test]
    fn merge_remote_accepts_present_but_empty_entries() {
        let mut book = ProductBook::default();
        book.set_status("a", STATUS_AVAILABLE, None);

        book.merge_remote(vec![card("a", 9.5)]);
        assert_eq!(book.price("a"), Some(9.5));
        // Local-only fields survive the field-level merge.
        assert_eq!(book.status("a"), STATUS_AVAILABLE);
    }

    #[test]
    fn subscription_upsert_may_introduce_new_ids() {
        let mut book = ProductBook::default();
        book.apply_change(ProductChange::Upsert(card("fresh", 4.0)));

        assert_eq!(book.price("fresh"), Some(4.0));
        assert!(book.catalog().iter().any(|p| p.id == "fresh"));
        assert!(book.is_consistent());
    }

    #[test]
    fn subscription_removal_hits_both_representations() {
        let mut book = ProductBook::default();
        book.upsert(card("a", 1.0));
        book.upsert(card("b", 2.0));

        book.apply_change(ProductChange::Remove("a".into()));
        assert!(book.get("a").is_none());
        assert!(!book.catalog().iter().any(|p| p.id == "a"));
        assert!(book.get("b").is_some());
        assert!(book.is_consistent());
    }

    #[test]
    fn load_save_roundtrip() {
        let store = LocalStore::in_memory();
        let mut book = ProductBook::default();
        book.upsert(card("a", 1.0));
        book.set_discount("a", 20.0);
        book.save(&store);

        let reloaded = ProductBook::load(&store);
        assert_eq!(reloaded, book);
    }

    #[test]
    fn unknown_remote_fields_are_preserved() {
        let mut book = ProductBook::default();
        book.upsert(card("a", 1.0));

        let mut remote = card("a", 1.0);
        remote
            .extra
            .insert("artworkUrl".into(), "https://example/a.png".into());
        book.merge_remote(vec![remote]);

        assert_eq!(
            book.get("a").unwrap().extra["artworkUrl"],
            "https://example/a.png"
        );
    }
}
