//! In-memory store client for service-level tests.
//!
//! Behaves like the remote store: carts merge added quantities per product,
//! order creation orders the whole cart and clears it, variant and image
//! collections assign fresh ids on creation. Failures are injectable per
//! operation, and every call is appended to an operation log so tests can
//! assert what was (and was not) issued remotely.

use async_trait::async_trait;
use atelier::records::{ImageId, ImageRecord, ProductId, Variant, VariantId};
use rustc_hash::FxHashMap;
use tokio::sync::Mutex;

use crate::{
    client::{StoreClient, StoreError},
    domain::{
        carts::models::{Cart, CartId, CartItemId, CartLineItem, NewCartItem, UserId},
        catalog::models::Product,
        checkout::models::{Order, OrderForm, OrderId, OrderLineItem, PaymentSlip},
    },
};

#[derive(Debug, Clone, Copy)]
enum FailRule {
    /// Fail every call.
    Always,
    /// Fail exactly the nth call (1-based).
    Nth(u32),
    /// Fail every call after the first n succeeded.
    After(u32),
}

#[derive(Default)]
struct CartState {
    cart_id: Option<CartId>,
    items: Vec<CartLineItem>,
}

#[derive(Default)]
struct StoreState {
    next_id: u64,
    carts: FxHashMap<UserId, CartState>,
    products: FxHashMap<ProductId, Product>,
    variants: FxHashMap<ProductId, Vec<Variant>>,
    images: FxHashMap<ProductId, Vec<ImageRecord>>,
    orders: Vec<Order>,
    slips: FxHashMap<OrderId, String>,
    ops: Vec<String>,
    counts: FxHashMap<&'static str, u32>,
    failures: FxHashMap<&'static str, FailRule>,
}

impl StoreState {
    fn alloc_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn cart_mut(&mut self, user: UserId) -> &mut CartState {
        if !self.carts.contains_key(&user) {
            let id = self.alloc_id();

            self.carts.insert(
                user,
                CartState {
                    cart_id: Some(CartId::from_u64(id)),
                    items: Vec::new(),
                },
            );
        }

        self.carts.get_mut(&user).expect("cart entry just ensured")
    }

    /// Log the call and apply any injected failure rule.
    fn enter(&mut self, op: &'static str) -> Result<(), StoreError> {
        self.ops.push(op.to_string());

        let count = self.counts.entry(op).or_insert(0);
        *count += 1;
        let nth = *count;

        let failed = match self.failures.get(op) {
            Some(FailRule::Always) => true,
            Some(FailRule::Nth(target)) => nth == *target,
            Some(FailRule::After(limit)) => nth > *limit,
            None => false,
        };

        if failed {
            Err(StoreError::UnexpectedResponse(format!(
                "injected failure in {op}"
            )))
        } else {
            Ok(())
        }
    }
}

pub(crate) struct InMemoryStoreClient {
    state: Mutex<StoreState>,
}

impl InMemoryStoreClient {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
        }
    }

    // Failure injection ----------------------------------------------------

    pub(crate) async fn fail(&self, op: &'static str) {
        self.state
            .lock()
            .await
            .failures
            .insert(op, FailRule::Always);
    }

    pub(crate) async fn fail_nth(&self, op: &'static str, nth: u32) {
        self.state
            .lock()
            .await
            .failures
            .insert(op, FailRule::Nth(nth));
    }

    pub(crate) async fn fail_after(&self, op: &'static str, limit: u32) {
        self.state
            .lock()
            .await
            .failures
            .insert(op, FailRule::After(limit));
    }

    pub(crate) async fn clear_failures(&self) {
        let mut state = self.state.lock().await;
        state.failures.clear();
        state.counts.clear();
    }

    // Inspection -----------------------------------------------------------

    pub(crate) async fn ops(&self) -> Vec<String> {
        self.state.lock().await.ops.clone()
    }

    pub(crate) async fn clear_ops(&self) {
        self.state.lock().await.ops.clear();
    }

    pub(crate) async fn cart_items(&self, user: UserId) -> Vec<CartLineItem> {
        self.state
            .lock()
            .await
            .carts
            .get(&user)
            .map(|cart| cart.items.clone())
            .unwrap_or_default()
    }

    pub(crate) async fn orders(&self) -> Vec<Order> {
        self.state.lock().await.orders.clone()
    }

    pub(crate) async fn slip_for(&self, order: OrderId) -> Option<String> {
        self.state.lock().await.slips.get(&order).cloned()
    }

    pub(crate) async fn variants(&self, product: ProductId) -> Vec<Variant> {
        self.state
            .lock()
            .await
            .variants
            .get(&product)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) async fn images(&self, product: ProductId) -> Vec<ImageRecord> {
        self.state
            .lock()
            .await
            .images
            .get(&product)
            .cloned()
            .unwrap_or_default()
    }

    // Seeding (bypasses the operation log) ---------------------------------

    pub(crate) async fn seed_cart(&self, user: UserId, lines: &[(u64, u32)]) -> Vec<CartItemId> {
        let mut state = self.state.lock().await;

        let mut ids = Vec::new();

        for &(product, quantity) in lines {
            let id = CartItemId::from_u64(state.alloc_id());
            ids.push(id);

            state.cart_mut(user).items.push(CartLineItem {
                cart_item_id: id,
                product_id: ProductId::from_u64(product),
                quantity,
                color: None,
                size: None,
            });
        }

        ids
    }

    pub(crate) async fn set_cart(&self, user: UserId, items: &[CartLineItem]) {
        let mut state = self.state.lock().await;
        state.cart_mut(user).items = items.to_vec();
    }

    pub(crate) async fn seed_product(&self, product: ProductId, name: &str, price_minor: u64) {
        let mut state = self.state.lock().await;

        state.products.insert(
            product,
            Product {
                product_id: product,
                name: name.to_string(),
                price_minor,
            },
        );
    }

    pub(crate) async fn seed_variants(
        &self,
        product: ProductId,
        entries: &[(&str, &str, u32)],
    ) {
        let mut state = self.state.lock().await;

        for &(size, color, quantity) in entries {
            let id = VariantId::from_u64(state.alloc_id());

            state.variants.entry(product).or_default().push(Variant {
                remote_id: Some(id),
                product_id: product,
                size: size.to_string(),
                color: color.to_string(),
                quantity,
                availability: true,
            });
        }
    }

    pub(crate) async fn seed_images(&self, product: ProductId, urls: &[&str]) {
        let mut state = self.state.lock().await;

        for &url in urls {
            let id = ImageId::from_u64(state.alloc_id());

            state.images.entry(product).or_default().push(ImageRecord {
                remote_id: Some(id),
                product_id: product,
                url: url.to_string(),
            });
        }
    }
}

#[async_trait]
impl StoreClient for InMemoryStoreClient {
    async fn get_cart(&self, user: UserId) -> Result<Cart, StoreError> {
        let mut state = self.state.lock().await;
        state.enter("get_cart")?;

        let cart = state.cart_mut(user);
        let cart_id = cart.cart_id.unwrap_or_else(|| CartId::from_u64(0));

        Ok(Cart {
            cart_id,
            user_id: user,
            items: cart.items.clone(),
        })
    }

    async fn clear_cart(&self, user: UserId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.enter("clear_cart")?;

        state.cart_mut(user).items.clear();

        Ok(())
    }

    async fn add_cart_item(
        &self,
        user: UserId,
        item: NewCartItem,
    ) -> Result<CartLineItem, StoreError> {
        let mut state = self.state.lock().await;
        state.enter("add_cart_item")?;

        let id = CartItemId::from_u64(state.alloc_id());
        let cart = state.cart_mut(user);

        // The store merges the quantity into an existing line item for the
        // same product.
        if let Some(line) = cart
            .items
            .iter_mut()
            .find(|line| line.product_id == item.product_id)
        {
            line.quantity += item.quantity;
            return Ok(line.clone());
        }

        let line = CartLineItem {
            cart_item_id: id,
            product_id: item.product_id,
            quantity: item.quantity,
            color: item.color,
            size: item.size,
        };

        cart.items.push(line.clone());

        Ok(line)
    }

    async fn remove_cart_item(&self, user: UserId, product: ProductId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.enter("remove_cart_item")?;

        state
            .cart_mut(user)
            .items
            .retain(|line| line.product_id != product);

        Ok(())
    }

    async fn update_cart_item_quantity(
        &self,
        item: CartItemId,
        quantity: u32,
    ) -> Result<CartLineItem, StoreError> {
        let mut state = self.state.lock().await;
        state.enter("update_cart_item_quantity")?;

        for cart in state.carts.values_mut() {
            if let Some(line) = cart
                .items
                .iter_mut()
                .find(|line| line.cart_item_id == item)
            {
                line.quantity = quantity;
                return Ok(line.clone());
            }
        }

        Err(StoreError::UnexpectedResponse(format!(
            "cart item {item} not found"
        )))
    }

    async fn create_order(&self, form: &OrderForm) -> Result<Order, StoreError> {
        let mut state = self.state.lock().await;
        state.enter("create_order")?;

        let order_id = OrderId::from_u64(state.alloc_id());
        let cart = state.cart_mut(form.user_id);

        if cart.items.is_empty() {
            return Err(StoreError::UnexpectedResponse(
                "cannot create order from empty cart".to_string(),
            ));
        }

        let items = cart
            .items
            .iter()
            .map(|line| OrderLineItem {
                product_id: line.product_id,
                quantity: line.quantity,
                color: line.color.clone(),
                size: line.size.clone(),
            })
            .collect();

        // The store clears the cart after a successful order.
        cart.items.clear();

        let order = Order { order_id, items };
        state.orders.push(order.clone());

        Ok(order)
    }

    async fn submit_payment_slip(
        &self,
        order: OrderId,
        slip: &PaymentSlip,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.enter("submit_payment_slip")?;

        let reference = match slip {
            PaymentSlip::Upload { filename, .. } => filename.clone(),
            PaymentSlip::Url(url) => url.clone(),
        };

        state.slips.insert(order, reference);

        Ok(())
    }

    async fn get_product(&self, product: ProductId) -> Result<Product, StoreError> {
        let mut state = self.state.lock().await;
        state.enter("get_product")?;

        state.products.get(&product).cloned().ok_or_else(|| {
            StoreError::UnexpectedResponse(format!("product {product} not found"))
        })
    }

    async fn get_variants(&self, product: ProductId) -> Result<Vec<Variant>, StoreError> {
        let mut state = self.state.lock().await;
        state.enter("get_variants")?;

        Ok(state.variants.get(&product).cloned().unwrap_or_default())
    }

    async fn create_variants_batch(&self, variants: &[Variant]) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.enter("create_variants_batch")?;

        for variant in variants {
            let id = VariantId::from_u64(state.alloc_id());

            state
                .variants
                .entry(variant.product_id)
                .or_default()
                .push(Variant {
                    remote_id: Some(id),
                    ..variant.clone()
                });
        }

        Ok(())
    }

    async fn delete_variant(&self, variant: VariantId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.enter("delete_variant")?;

        for list in state.variants.values_mut() {
            list.retain(|record| record.remote_id != Some(variant));
        }

        Ok(())
    }

    async fn get_images(&self, product: ProductId) -> Result<Vec<ImageRecord>, StoreError> {
        let mut state = self.state.lock().await;
        state.enter("get_images")?;

        Ok(state.images.get(&product).cloned().unwrap_or_default())
    }

    async fn create_images_batch(&self, images: &[ImageRecord]) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.enter("create_images_batch")?;

        for image in images {
            let id = ImageId::from_u64(state.alloc_id());

            state
                .images
                .entry(image.product_id)
                .or_default()
                .push(ImageRecord {
                    remote_id: Some(id),
                    ..image.clone()
                });
        }

        Ok(())
    }

    async fn delete_image(&self, image: ImageId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.enter("delete_image")?;

        for list in state.images.values_mut() {
            list.retain(|record| record.remote_id != Some(image));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn adding_the_same_product_twice_merges_quantity() {
        let store = InMemoryStoreClient::new();
        let user = UserId::from_u64(1);

        let item = NewCartItem {
            product_id: ProductId::from_u64(3),
            quantity: 2,
            color: None,
            size: None,
        };

        let first = store
            .add_cart_item(user, item.clone())
            .await
            .expect("add should succeed");

        let second = store
            .add_cart_item(user, item)
            .await
            .expect("add should succeed");

        assert_eq!(
            first.cart_item_id, second.cart_item_id,
            "the existing line item absorbs the addition"
        );
        assert_eq!(second.quantity, 4, "quantities merge per product");
        assert_eq!(store.cart_items(user).await.len(), 1);
    }

    #[tokio::test]
    async fn seeded_product_is_served() {
        let store = InMemoryStoreClient::new();
        let product = ProductId::from_u64(7);

        store.seed_product(product, "Linen Shirt", 4_999_00).await;

        let served = store
            .get_product(product)
            .await
            .expect("get_product should succeed");

        assert_eq!(served.name, "Linen Shirt");
        assert_eq!(served.price_minor, 4_999_00);

        let missing = store.get_product(ProductId::from_u64(8)).await;
        assert!(missing.is_err(), "unknown products are an error");
    }
}

