//! Cart Models

use atelier::{ids::TypedId, records::ProductId};
use jiff::Timestamp;

/// Marker for user identifiers. The storefront holds no user record.
#[derive(Debug, Clone, Copy)]
pub struct UserRef;

/// User identifier.
pub type UserId = TypedId<UserRef>;

/// Cart identifier.
pub type CartId = TypedId<Cart>;

/// Cart line item identifier.
pub type CartItemId = TypedId<CartLineItem>;

/// A user's remote cart as last read from the store.
#[derive(Debug, Clone)]
pub struct Cart {
    pub cart_id: CartId,
    pub user_id: UserId,
    pub items: Vec<CartLineItem>,
}

/// One line of a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLineItem {
    pub cart_item_id: CartItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl CartLineItem {
    /// The add-to-cart form that recreates this line item. Used when a
    /// snapshot is replayed; the store assigns a fresh line item id.
    #[must_use]
    pub fn to_new_item(&self) -> NewCartItem {
        NewCartItem {
            product_id: self.product_id,
            quantity: self.quantity,
            color: self.color.clone(),
            size: self.size.clone(),
        }
    }
}

/// Input for adding an item to a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub color: Option<String>,
    pub size: Option<String>,
}

/// An immutable point-in-time copy of a user's cart.
///
/// The snapshot is the rollback target for a checkout transaction; it is
/// never mutated after capture.
#[derive(Debug, Clone)]
pub struct CartSnapshot {
    pub cart_id: CartId,
    pub user_id: UserId,
    pub items: Vec<CartLineItem>,
    pub captured_at: Timestamp,
}
