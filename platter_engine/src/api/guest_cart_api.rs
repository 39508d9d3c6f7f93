use std::{fmt::Debug, sync::Arc};

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::LineKind,
    traits::{CacheError, GuestCache},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartEntry {
    pub restaurant_id: i64,
    pub line_kind: LineKind,
    pub item_id: i64,
    pub quantity: u32,
    #[serde(default)]
    pub option_ids: Vec<i64>,
}

impl CartEntry {
    /// Two entries describe the same product if everything except the quantity matches.
    pub fn same_product(&self, other: &CartEntry) -> bool {
        self.restaurant_id == other.restaurant_id &&
            self.line_kind == other.line_kind &&
            self.item_id == other.item_id &&
            self.option_ids == other.option_ids
    }
}

/// `GuestCartApi` keeps an anonymous guest's cart in the guest cache, under `guest_cart:{guest_id}`.
#[derive(Clone)]
pub struct GuestCartApi {
    cache: Arc<dyn GuestCache>,
}

impl Debug for GuestCartApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GuestCartApi")
    }
}

pub fn cart_key(guest_id: &str) -> String {
    format!("guest_cart:{guest_id}")
}

impl GuestCartApi {
    pub fn new(cache: Arc<dyn GuestCache>) -> Self {
        Self { cache }
    }

    pub async fn entries(&self, guest_id: &str) -> Result<Vec<CartEntry>, CacheError> {
        let key = cart_key(guest_id);
        match self.cache.get(&key).await? {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| CacheError::CorruptValue { key: key.clone(), reason: e.to_string() }),
            None => Ok(Vec::new()),
        }
    }

    /// Adds an entry to the cart. If the cart already holds the same product, its quantity is replaced instead. A zero
    /// quantity removes the product. Returns the updated cart.
    ///
    /// The cart is read, changed and written back in separate cache calls. Two concurrent updates to the same cart can
    /// overwrite each other; guest carts are best-effort state.
    pub async fn add_entry(&self, guest_id: &str, entry: CartEntry) -> Result<Vec<CartEntry>, CacheError> {
        let mut entries = self.entries(guest_id).await?;
        match entries.iter().position(|e| e.same_product(&entry)) {
            Some(i) if entry.quantity == 0 => {
                entries.remove(i);
            },
            Some(i) => entries[i].quantity = entry.quantity,
            None if entry.quantity == 0 => {},
            None => entries.push(entry),
        }
        self.store(guest_id, &entries).await?;
        trace!("🛒️ Guest {guest_id} has {} entries in their cart", entries.len());
        Ok(entries)
    }

    pub async fn clear(&self, guest_id: &str) -> Result<(), CacheError> {
        self.cache.delete(&cart_key(guest_id)).await
    }

    /// Moves the cart of `old_guest_id` onto `new_guest_id`. The result is the union of both carts with one entry per
    /// product: entries from the new cart first, then every product from the old cart that the new cart does not
    /// already hold. Where both carts hold a product, the new cart's quantity wins. The old cart is removed. Running
    /// the merge again has no further effect.
    ///
    /// Like [`Self::add_entry`], this is a read-modify-write on the cache and is not atomic. A concurrent change to
    /// either cart while the merge runs can be lost.
    pub async fn merge(&self, old_guest_id: &str, new_guest_id: &str) -> Result<Vec<CartEntry>, CacheError> {
        if old_guest_id == new_guest_id {
            return self.entries(new_guest_id).await;
        }
        let old = self.entries(old_guest_id).await?;
        let mut merged = self.entries(new_guest_id).await?;
        for entry in old {
            if !merged.iter().any(|e| e.same_product(&entry)) {
                merged.push(entry);
            }
        }
        self.store(new_guest_id, &merged).await?;
        self.clear(old_guest_id).await?;
        debug!("🛒️ Cart of {old_guest_id} merged into {new_guest_id}. {} entries", merged.len());
        Ok(merged)
    }

    async fn store(&self, guest_id: &str, entries: &[CartEntry]) -> Result<(), CacheError> {
        let key = cart_key(guest_id);
        let json = serde_json::to_string(entries)
            .map_err(|e| CacheError::CorruptValue { key: key.clone(), reason: e.to_string() })?;
        self.cache.set(&key, &json, None).await
    }
}
