//! HTTP implementation of the store client.

use async_trait::async_trait;
use atelier::records::{ImageId, ImageRecord, ProductId, Variant, VariantId};
use reqwest::{
    Client, Method, RequestBuilder, Response,
    multipart::{Form, Part},
};
use serde::{Deserialize, Serialize};

use crate::{
    client::{StoreClient, StoreConfig, StoreError},
    domain::{
        carts::models::{Cart, CartId, CartItemId, CartLineItem, NewCartItem, UserId},
        catalog::models::Product,
        checkout::models::{Order, OrderForm, OrderId, OrderLineItem, PaymentSlip},
    },
};

/// HTTP client for the remote store's JSON API.
#[derive(Debug, Clone)]
pub struct HttpStoreClient {
    config: StoreConfig,
    http: Client,
}

impl HttpStoreClient {
    /// Build a client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying HTTP client cannot be built.
    pub fn from_config(config: StoreConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            config,
            http: Client::builder().build()?,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.config.base_url);

        let request = self.http.request(method, url);

        match &self.config.token {
            Some(token) => request.bearer_auth(token.as_str()),
            None => request,
        }
    }
}

async fn ensure_success(response: Response, context: &str) -> Result<Response, StoreError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    Err(StoreError::UnexpectedResponse(format!(
        "{context} failed with status {status}: {text}"
    )))
}

#[async_trait]
impl StoreClient for HttpStoreClient {
    async fn get_cart(&self, user: UserId) -> Result<Cart, StoreError> {
        let response = self
            .request(Method::GET, &format!("/api/v1/cart/user/{user}"))
            .send()
            .await?;

        let payload: CartPayload = ensure_success(response, "get cart").await?.json().await?;

        Ok(payload.into())
    }

    async fn clear_cart(&self, user: UserId) -> Result<(), StoreError> {
        let response = self
            .request(Method::DELETE, &format!("/api/v1/cart/user/{user}/clear"))
            .send()
            .await?;

        ensure_success(response, "clear cart").await?;

        Ok(())
    }

    async fn add_cart_item(
        &self,
        user: UserId,
        item: NewCartItem,
    ) -> Result<CartLineItem, StoreError> {
        let body = AddCartItemPayload {
            user_id: user,
            product_id: item.product_id,
            quantity: item.quantity,
            color: item.color,
            size: item.size,
        };

        let response = self
            .request(Method::POST, "/api/v1/cart/add")
            .json(&body)
            .send()
            .await?;

        let cart: Cart = ensure_success(response, "add cart item")
            .await?
            .json::<CartPayload>()
            .await?
            .into();

        // The store answers with the whole cart; the affected line item is
        // the one holding the added product.
        cart.items
            .into_iter()
            .find(|line| line.product_id == body.product_id)
            .ok_or_else(|| {
                StoreError::UnexpectedResponse(format!(
                    "added product {} missing from returned cart",
                    body.product_id
                ))
            })
    }

    async fn remove_cart_item(&self, user: UserId, product: ProductId) -> Result<(), StoreError> {
        let response = self
            .request(
                Method::DELETE,
                &format!("/api/v1/cart/user/{user}/product/{product}"),
            )
            .send()
            .await?;

        ensure_success(response, "remove cart item").await?;

        Ok(())
    }

    async fn update_cart_item_quantity(
        &self,
        item: CartItemId,
        quantity: u32,
    ) -> Result<CartLineItem, StoreError> {
        let response = self
            .request(Method::PUT, &format!("/api/v1/cart/item/{item}"))
            .json(&UpdateCartItemPayload { quantity })
            .send()
            .await?;

        let cart: Cart = ensure_success(response, "update cart item quantity")
            .await?
            .json::<CartPayload>()
            .await?
            .into();

        cart.items
            .into_iter()
            .find(|line| line.cart_item_id == item)
            .ok_or_else(|| {
                StoreError::UnexpectedResponse(format!(
                    "cart item {item} missing from returned cart"
                ))
            })
    }

    async fn create_order(&self, form: &OrderForm) -> Result<Order, StoreError> {
        let response = self
            .request(Method::POST, "/api/v1/orders/create")
            .json(form)
            .send()
            .await?;

        let payload: OrderPayload = ensure_success(response, "create order")
            .await?
            .json()
            .await?;

        Ok(payload.into())
    }

    async fn submit_payment_slip(
        &self,
        order: OrderId,
        slip: &PaymentSlip,
    ) -> Result<(), StoreError> {
        let response = match slip {
            PaymentSlip::Upload { filename, bytes } => {
                let part = Part::bytes(bytes.clone())
                    .file_name(filename.clone())
                    .mime_str(slip_mime(filename))?;

                self.request(
                    Method::POST,
                    &format!("/api/v1/orders/{order}/payment-slip"),
                )
                .multipart(Form::new().part("file", part))
                .send()
                .await?
            }
            PaymentSlip::Url(url) => {
                self.request(
                    Method::POST,
                    &format!("/api/v1/orders/{order}/payment-slip-url"),
                )
                .json(&serde_json::json!({ "url": url }))
                .send()
                .await?
            }
        };

        ensure_success(response, "submit payment slip").await?;

        Ok(())
    }

    async fn get_product(&self, product: ProductId) -> Result<Product, StoreError> {
        let response = self
            .request(Method::GET, &format!("/api/v1/products/{product}"))
            .send()
            .await?;

        let payload: ProductPayload = ensure_success(response, "get product")
            .await?
            .json()
            .await?;

        Ok(payload.into())
    }

    async fn get_variants(&self, product: ProductId) -> Result<Vec<Variant>, StoreError> {
        let response = self
            .request(
                Method::GET,
                &format!("/api/v1/colors-size-quantity-availability/product/{product}"),
            )
            .send()
            .await?;

        Ok(ensure_success(response, "get variants").await?.json().await?)
    }

    async fn create_variants_batch(&self, variants: &[Variant]) -> Result<(), StoreError> {
        let response = self
            .request(Method::POST, "/api/v1/colors-size-quantity-availability/batch")
            .json(variants)
            .send()
            .await?;

        ensure_success(response, "create variants batch").await?;

        Ok(())
    }

    async fn delete_variant(&self, variant: VariantId) -> Result<(), StoreError> {
        let response = self
            .request(
                Method::DELETE,
                &format!("/api/v1/colors-size-quantity-availability/{variant}"),
            )
            .send()
            .await?;

        ensure_success(response, "delete variant").await?;

        Ok(())
    }

    async fn get_images(&self, product: ProductId) -> Result<Vec<ImageRecord>, StoreError> {
        let response = self
            .request(Method::GET, &format!("/api/v1/images/product/{product}"))
            .send()
            .await?;

        Ok(ensure_success(response, "get images").await?.json().await?)
    }

    async fn create_images_batch(&self, images: &[ImageRecord]) -> Result<(), StoreError> {
        // The store has no batch endpoint for images; one request per record.
        for image in images {
            let response = self
                .request(Method::POST, "/api/v1/images")
                .json(image)
                .send()
                .await?;

            ensure_success(response, "create image").await?;
        }

        Ok(())
    }

    async fn delete_image(&self, image: ImageId) -> Result<(), StoreError> {
        let response = self
            .request(Method::DELETE, &format!("/api/v1/images/{image}"))
            .send()
            .await?;

        ensure_success(response, "delete image").await?;

        Ok(())
    }
}

fn slip_mime(filename: &str) -> &'static str {
    let lower = filename.to_lowercase();

    if lower.ends_with(".pdf") {
        "application/pdf"
    } else if lower.ends_with(".png") {
        "image/png"
    } else {
        "image/jpeg"
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartPayload {
    cart_id: CartId,
    user_id: UserId,
    #[serde(default)]
    items: Vec<CartItemPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartItemPayload {
    cart_item_id: CartItemId,
    product_id: ProductId,
    // Older store responses carry `cartItemsQuantity` instead of `quantity`.
    #[serde(alias = "cartItemsQuantity")]
    quantity: u32,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    size: Option<String>,
}

impl From<CartPayload> for Cart {
    fn from(payload: CartPayload) -> Self {
        Self {
            cart_id: payload.cart_id,
            user_id: payload.user_id,
            items: payload.items.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<CartItemPayload> for CartLineItem {
    fn from(payload: CartItemPayload) -> Self {
        Self {
            cart_item_id: payload.cart_item_id,
            product_id: payload.product_id,
            quantity: payload.quantity,
            color: payload.color,
            size: payload.size,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddCartItemPayload {
    user_id: UserId,
    product_id: ProductId,
    quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpdateCartItemPayload {
    quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductPayload {
    product_id: ProductId,
    #[serde(default)]
    name: Option<String>,
    /// Major-unit decimal price as served by the store.
    #[serde(default)]
    product_price: f64,
}

impl From<ProductPayload> for Product {
    fn from(payload: ProductPayload) -> Self {
        let name = payload
            .name
            .unwrap_or_else(|| format!("Product #{}", payload.product_id));

        Self {
            product_id: payload.product_id,
            name,
            price_minor: to_minor_units(payload.product_price),
        }
    }
}

/// Convert a major-unit decimal price into minor units, rounding to the
/// nearest cent. Prices are non-negative and far below the integer f64
/// limit.
fn to_minor_units(major: f64) -> u64 {
    (major * 100.0).round().max(0.0) as u64
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderPayload {
    order_id: OrderId,
    #[serde(default)]
    items: Vec<OrderItemPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderItemPayload {
    product_id: ProductId,
    quantity: u32,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    size: Option<String>,
}

impl From<OrderPayload> for Order {
    fn from(payload: OrderPayload) -> Self {
        Self {
            order_id: payload.order_id,
            items: payload
                .items
                .into_iter()
                .map(|item| OrderLineItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    color: item.color,
                    size: item.size,
                })
                .collect(),
        }
    }
}
