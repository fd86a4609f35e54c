//! Remote Store Client
//!
//! Thin wrapper over the store's CRUD endpoints for carts, orders, product
//! variants, and product images. Every orchestration service in this crate
//! talks to the store exclusively through the [`StoreClient`] trait.

mod http;

use std::fmt;

use async_trait::async_trait;
use atelier::records::{ImageId, ImageRecord, ProductId, Variant, VariantId};
use mockall::automock;
use thiserror::Error;
use zeroize::Zeroize;

pub use http::HttpStoreClient;

use crate::domain::{
    carts::models::{Cart, CartItemId, CartLineItem, NewCartItem, UserId},
    catalog::models::Product,
    checkout::models::{Order, OrderForm, OrderId, PaymentSlip},
};

/// Configuration for connecting to the remote store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Store API address, e.g. `"http://localhost:8080"`, without a
    /// trailing slash.
    pub base_url: String,

    /// Optional bearer token attached to every request.
    pub token: Option<ApiToken>,
}

/// Bearer token material. Redacted in debug output and zeroized on drop.
#[derive(Clone)]
pub struct ApiToken(String);

impl ApiToken {
    /// Wrap raw token material.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(**redacted**)")
    }
}

impl Drop for ApiToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Errors that can occur when communicating with the remote store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An HTTP transport or serialization error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store returned a non-2xx response or an unexpected body.
    #[error("unexpected response from store: {0}")]
    UnexpectedResponse(String),
}

/// Remote CRUD operations consumed by the orchestration services.
///
/// The store offers no transactions; every operation is independent, and the
/// services layered on top are responsible for sequencing and compensation.
#[automock]
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Fetch the user's current cart, creating an empty one if absent.
    async fn get_cart(&self, user: UserId) -> Result<Cart, StoreError>;

    /// Remove every line item from the user's cart.
    async fn clear_cart(&self, user: UserId) -> Result<(), StoreError>;

    /// Add an item to the user's cart. The store merges the quantity into an
    /// existing line item for the same product.
    async fn add_cart_item(&self, user: UserId, item: NewCartItem)
    -> Result<CartLineItem, StoreError>;

    /// Remove the line item for the given product from the user's cart.
    async fn remove_cart_item(&self, user: UserId, product: ProductId) -> Result<(), StoreError>;

    /// Set a line item's quantity.
    async fn update_cart_item_quantity(
        &self,
        item: CartItemId,
        quantity: u32,
    ) -> Result<CartLineItem, StoreError>;

    /// Create an order from the whole of the user's current cart. The store
    /// clears the cart on success.
    async fn create_order(&self, form: &OrderForm) -> Result<Order, StoreError>;

    /// Register a payment slip against a created order.
    async fn submit_payment_slip(
        &self,
        order: OrderId,
        slip: &PaymentSlip,
    ) -> Result<(), StoreError>;

    /// Fetch one product.
    async fn get_product(&self, product: ProductId) -> Result<Product, StoreError>;

    /// Fetch the product's stock variants.
    async fn get_variants(&self, product: ProductId) -> Result<Vec<Variant>, StoreError>;

    /// Create a batch of stock variants in one call.
    async fn create_variants_batch(&self, variants: &[Variant]) -> Result<(), StoreError>;

    /// Delete one stock variant by its remote identifier.
    async fn delete_variant(&self, variant: VariantId) -> Result<(), StoreError>;

    /// Fetch the product's images.
    async fn get_images(&self, product: ProductId) -> Result<Vec<ImageRecord>, StoreError>;

    /// Create a batch of images. The store takes one request per image; a
    /// mid-batch failure leaves the earlier images created.
    async fn create_images_batch(&self, images: &[ImageRecord]) -> Result<(), StoreError>;

    /// Delete one image by its remote identifier.
    async fn delete_image(&self, image: ImageId) -> Result<(), StoreError>;
}
