//! Cart, address and saved-design operations.

use serde_json::Value;

use cardforce_engine::{
    address::{self, Address},
    cart,
    error::{Error, Result},
    keys,
};
use chrono::Utc;

use super::Storefront;
use crate::sync::SyncOutcome;

impl Storefront {
    /// The signed-in user's cart; empty when signed out.
    pub fn cart_items(&self) -> Vec<cart::CartItem> {
        match self.current_user_id() {
            Some(user) => cart::cart_items(self.local(), &user),
            None => Vec::new(),
        }
    }

    /// Replace the cart wholesale and push it remotely.
    pub async fn save_cart(&self, items: &[cart::CartItem]) -> Result<SyncOutcome> {
        let user = self.current_user_id().ok_or(Error::NotSignedIn)?;
        cart::replace_cart(self.local(), &user, items);
        Ok(self.sync().push_cart(&user).await)
    }

    /// Empty the cart locally and push the empty cart.
    pub async fn clear_cart(&self) -> Result<SyncOutcome> {
        self.save_cart(&[]).await
    }

    /// The signed-in user's addresses; empty when signed out.
    pub fn addresses(&self) -> Vec<Address> {
        match self.current_user_id() {
            Some(user) => address::addresses(self.local(), &user),
            None => Vec::new(),
        }
    }

    /// Upsert an address locally, then push every address.
    pub async fn save_address(&self, entry: Address) -> Result<(Address, SyncOutcome)> {
        let user = self.current_user_id().ok_or(Error::NotSignedIn)?;
        let saved = address::save_address(self.local(), &user, entry, Utc::now());
        let outcome = self.sync().push_addresses(&user).await;
        Ok((saved, outcome))
    }

    /// Delete an address locally. Remote copies disappear on the next
    /// explicit pull-replace, not here.
    pub fn delete_address(&self, address_id: i64) -> Result<()> {
        let user = self.current_user_id().ok_or(Error::NotSignedIn)?;
        address::delete_address(self.local(), &user, address_id);
        Ok(())
    }

    /// Replace the local address list with the remote one.
    pub async fn refresh_addresses(&self) -> Result<SyncOutcome> {
        let user = self.current_user_id().ok_or(Error::NotSignedIn)?;
        Ok(self.sync().pull_addresses(&user).await)
    }

    /// The signed-in user's saved designs; empty when signed out.
    pub fn saved_designs(&self) -> Vec<Value> {
        match self.current_user_id() {
            Some(user) => self.local().get(&keys::saved_designs(&user)),
            None => Vec::new(),
        }
    }

    /// Append a saved design and mirror the list into the user's profile.
    pub async fn save_design(&self, design: Value) -> Result<SyncOutcome> {
        let user = self.current_user_id().ok_or(Error::NotSignedIn)?;
        let key = keys::saved_designs(&user);
        let mut designs: Vec<Value> = self.local().get(&key);
        designs.push(design);
        self.local().set(&key, &designs);
        Ok(self.sync().push_saved_designs(&user).await)
    }

    /// Copy remotely saved designs back into the local store.
    pub async fn refresh_saved_designs(&self) -> Result<SyncOutcome> {
        let user = self.current_user_id().ok_or(Error::NotSignedIn)?;
        Ok(self.sync().pull_saved_designs(&user).await)
    }
}
