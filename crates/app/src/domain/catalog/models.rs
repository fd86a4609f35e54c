//! Catalog Models

use atelier::records::ProductId;

/// A product as read from the store, reduced to the fields the cart
/// summary needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub product_id: ProductId,
    pub name: String,
    /// Unit price in minor units. The store serves a decimal major-unit
    /// price; the client converts once at the wire boundary.
    pub price_minor: u64,
}
