//! Shopping cart state held on the buyer's side.
//!
//! `CartStore` owns the line list and writes it through a [`CartStorage`]
//! after every mutation. A failed write is logged and the in-memory cart is
//! kept as is.

mod storage;

pub use storage::*;

use crate::models::OrderLineRequest;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The product fields the cart needs, captured when the product was added.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    #[serde(alias = "stock_quantity")]
    pub stock_quantity: i32,
    #[serde(default, alias = "image_url")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Stable id used to match this line to its order item.
    pub line_id: Uuid,
    pub product: ProductSnapshot,
    pub quantity: i32,
    #[serde(default)]
    pub personalization: Option<String>,
}

/// `1 ≤ quantity ≤ stock`, treating an out-of-stock product as stock 1 so the
/// range is never empty.
fn clamp_quantity(quantity: i32, stock: i32) -> i32 {
    quantity.clamp(1, stock.max(1))
}

pub struct CartStore<S: CartStorage> {
    items: Vec<CartItem>,
    is_open: bool,
    storage: S,
}

impl<S: CartStorage> CartStore<S> {
    /// Restore the cart persisted in `storage`, or start empty.
    pub fn load(storage: S) -> Self {
        let items = match storage.load(CART_STORAGE_KEY) {
            Ok(Some(raw)) => decode_cart(&raw),
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("Failed to read saved cart: {e}");
                Vec::new()
            }
        };
        Self {
            items,
            is_open: false,
            storage,
        }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the cart drawer is showing.
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn set_open(&mut self, open: bool) {
        self.is_open = open;
    }

    /// Add `quantity` of `product`, merging with an existing line and capping
    /// at the product's stock. Non-positive quantities and sold-out products
    /// are ignored.
    pub fn add_item(&mut self, product: ProductSnapshot, quantity: i32) {
        if quantity < 1 || product.stock_quantity < 1 {
            log::debug!(
                "Ignoring add of {quantity} x {} (stock {})",
                product.id,
                product.stock_quantity
            );
            return;
        }

        match self.items.iter_mut().find(|i| i.product.id == product.id) {
            Some(existing) => {
                let wanted = existing.quantity.saturating_add(quantity);
                existing.quantity = wanted.min(product.stock_quantity);
                existing.product = product;
            }
            None => {
                let quantity = quantity.min(product.stock_quantity);
                self.items.push(CartItem {
                    line_id: Uuid::new_v4(),
                    product,
                    quantity,
                    personalization: None,
                });
            }
        }

        self.is_open = true;
        self.persist();
    }

    pub fn remove_item(&mut self, product_id: Uuid) {
        self.items.retain(|i| i.product.id != product_id);
        self.persist();
    }

    pub fn update_quantity(&mut self, product_id: Uuid, quantity: i32) {
        if let Some(item) = self.items.iter_mut().find(|i| i.product.id == product_id) {
            item.quantity = clamp_quantity(quantity, item.product.stock_quantity);
            self.persist();
        }
    }

    /// Attach a personalization note to a line; blank notes clear it.
    pub fn set_personalization(&mut self, product_id: Uuid, note: Option<String>) {
        if let Some(item) = self.items.iter_mut().find(|i| i.product.id == product_id) {
            item.personalization = note
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty());
            self.persist();
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.persist();
    }

    pub fn total_items(&self) -> i64 {
        self.items.iter().map(|i| i64::from(i.quantity)).sum()
    }

    /// Saturates at `i64::MAX` instead of overflowing on absurd snapshots.
    pub fn total_price(&self) -> i64 {
        self.items.iter().fold(0i64, |total, i| {
            total.saturating_add(i.product.price.saturating_mul(i64::from(i.quantity)))
        })
    }

    /// Order lines for checkout, carrying each line id through.
    pub fn order_lines(&self) -> Vec<OrderLineRequest> {
        self.items
            .iter()
            .map(|i| OrderLineRequest {
                line_id: i.line_id,
                product_id: i.product.id,
                quantity: i.quantity,
                personalization: i.personalization.clone(),
            })
            .collect()
    }

    fn persist(&self) {
        let result = if self.items.is_empty() {
            self.storage.remove(CART_STORAGE_KEY)
        } else {
            encode_cart(&self.items).and_then(|raw| self.storage.save(CART_STORAGE_KEY, &raw))
        };
        if let Err(e) = result {
            log::warn!("Failed to save cart: {e}");
        }
    }
}
