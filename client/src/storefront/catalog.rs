//! Product and stock operations.
//!
//! Every product mutation saves both local representations and then pushes
//! the whole data map, the way catalog saves always have; single-product
//! upserts additionally push just that product so admin edits land fast.

use cardforce_engine::{product::Product, stock, ProductBook};

use super::Storefront;
use crate::sync::SyncOutcome;

impl Storefront {
    /// Both product representations, loaded fresh from the local store.
    pub fn product_book(&self) -> ProductBook {
        ProductBook::load(self.local())
    }

    pub fn product_price(&self, product_id: &str) -> Option<f64> {
        self.product_book().price(product_id)
    }

    pub fn product_discount(&self, product_id: &str) -> f64 {
        self.product_book().discount(product_id)
    }

    pub fn product_status(&self, product_id: &str) -> String {
        self.product_book().status(product_id)
    }

    /// Set a product's base price and sync.
    pub async fn set_product_price(&self, product_id: &str, price: f64) -> SyncOutcome {
        let mut book = self.product_book();
        book.set_price(product_id, price);
        book.save(self.local());
        self.sync().push_products().await
    }

    /// Set a product's discount percent and sync.
    pub async fn set_product_discount(&self, product_id: &str, discount: f64) -> SyncOutcome {
        let mut book = self.product_book();
        book.set_discount(product_id, discount);
        book.save(self.local());
        self.sync().push_products().await
    }

    /// Set a product's availability status and sync.
    pub async fn set_product_status(
        &self,
        product_id: &str,
        status: &str,
        backorder_days: Option<u32>,
    ) -> SyncOutcome {
        let mut book = self.product_book();
        book.set_status(product_id, status, backorder_days);
        book.save(self.local());
        self.sync().push_products().await
    }

    /// Upsert a catalog product locally and push it.
    pub async fn upsert_catalog_product(&self, product: Product) -> SyncOutcome {
        let mut book = self.product_book();
        book.upsert(product.clone());
        book.save(self.local());
        self.sync().push_product(&product).await
    }

    /// Remove a product from both local representations and delete its
    /// remote document. Local absence then tombstones it against pulls.
    pub async fn remove_product(&self, product_id: &str) -> SyncOutcome {
        let mut book = self.product_book();
        book.remove(product_id);
        book.save(self.local());
        self.sync().delete_product(product_id).await
    }

    /// Explicit tombstone-respecting product pull.
    pub async fn refresh_products(&self) -> SyncOutcome {
        self.sync().pull_products().await
    }

    /// Current stock for an item.
    pub fn stock(&self, item_id: &str) -> u32 {
        stock::get_stock(self.local(), item_id)
    }

    /// Set an item's stock and push it.
    pub async fn set_stock(&self, item_id: &str, quantity: u32) -> SyncOutcome {
        stock::update_stock(self.local(), item_id, quantity);
        self.sync().push_stock(item_id).await
    }

    /// Reduce an item's stock (clamped at zero) and push the new count.
    pub async fn reduce_stock(&self, item_id: &str, amount: u32) -> (u32, SyncOutcome) {
        let remaining = stock::reduce_stock(self.local(), item_id, amount);
        let outcome = self.sync().push_stock(item_id).await;
        (remaining, outcome)
    }

    /// Explicit field-overwrite stock pull.
    pub async fn refresh_stock(&self) -> SyncOutcome {
        self.sync().pull_stock().await
    }
}
