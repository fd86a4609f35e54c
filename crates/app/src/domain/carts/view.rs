//! Optimistic Cart View
//!
//! The locally displayed cart for one user. Quantity updates are applied to
//! the local view before the remote call resolves; additions and removals
//! are remote-first because they change the line-item set's identity. A
//! per-view async mutex admits at most one mutation at a time — concurrent
//! mutations are rejected, not queued.

use std::{sync::Arc, time::Duration};

use atelier::records::ProductId;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use crate::{
    client::StoreClient,
    domain::carts::{
        errors::CartViewError,
        models::{CartItemId, CartLineItem, NewCartItem, UserId},
    },
};

/// Delay before the post-update re-fetch, giving the store time to settle
/// its derived state.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(750);

/// Locally held view of one user's cart.
#[derive(Clone)]
pub struct CartView {
    client: Arc<dyn StoreClient>,
    user_id: UserId,
    items: Arc<RwLock<Vec<CartLineItem>>>,
    gate: Arc<Mutex<()>>,
    settle_delay: Duration,
}

impl CartView {
    #[must_use]
    pub fn new(client: Arc<dyn StoreClient>, user_id: UserId) -> Self {
        Self::with_settle_delay(client, user_id, DEFAULT_SETTLE_DELAY)
    }

    #[must_use]
    pub fn with_settle_delay(
        client: Arc<dyn StoreClient>,
        user_id: UserId,
        settle_delay: Duration,
    ) -> Self {
        Self {
            client,
            user_id,
            items: Arc::new(RwLock::new(Vec::new())),
            gate: Arc::new(Mutex::new(())),
            settle_delay,
        }
    }

    /// The current local view.
    pub async fn items(&self) -> Vec<CartLineItem> {
        self.items.read().await.clone()
    }

    /// Replace the local view with a fresh read of the remote cart.
    ///
    /// # Errors
    ///
    /// Returns an error when the read fails; the local view is unchanged.
    pub async fn refresh(&self) -> Result<Vec<CartLineItem>, CartViewError> {
        let _gate = self.gate.lock().await;

        self.fetch_and_replace().await
    }

    /// Set a line item's quantity.
    ///
    /// The local view is updated immediately, before the remote call
    /// resolves. On success a re-fetch is scheduled after the settle delay.
    /// On failure the optimistic view is NOT rolled back: the error is
    /// surfaced and the view converges on the next successful fetch.
    ///
    /// # Errors
    ///
    /// [`CartViewError::Busy`] when another mutation is in flight;
    /// [`CartViewError::Store`] when the remote update fails.
    pub async fn update_quantity(
        &self,
        item: CartItemId,
        quantity: u32,
    ) -> Result<Vec<CartLineItem>, CartViewError> {
        let _gate = self.gate.try_lock().map_err(|_| CartViewError::Busy)?;

        {
            let mut items = self.items.write().await;

            if let Some(line) = items.iter_mut().find(|line| line.cart_item_id == item) {
                line.quantity = quantity;
            }
        }

        if let Err(error) = self.client.update_cart_item_quantity(item, quantity).await {
            warn!(item = %item, error = %error, "quantity update failed; keeping optimistic view");
            return Err(CartViewError::Store(error));
        }

        self.schedule_settle_refresh();

        Ok(self.items.read().await.clone())
    }

    /// Add an item to the cart. Remote-first: the local view updates only
    /// from a fresh read after the call resolves, because the store assigns
    /// the resulting line item id (and may merge into an existing line).
    ///
    /// # Errors
    ///
    /// [`CartViewError::Busy`] when another mutation is in flight;
    /// [`CartViewError::Store`] when a remote call fails.
    pub async fn add_item(&self, item: NewCartItem) -> Result<Vec<CartLineItem>, CartViewError> {
        let _gate = self.gate.try_lock().map_err(|_| CartViewError::Busy)?;

        self.client.add_cart_item(self.user_id, item).await?;

        self.fetch_and_replace().await
    }

    /// Remove the line item for a product. Remote-first, like [`Self::add_item`].
    ///
    /// # Errors
    ///
    /// [`CartViewError::Busy`] when another mutation is in flight;
    /// [`CartViewError::Store`] when a remote call fails.
    pub async fn remove_item(&self, product: ProductId) -> Result<Vec<CartLineItem>, CartViewError> {
        let _gate = self.gate.try_lock().map_err(|_| CartViewError::Busy)?;

        self.client.remove_cart_item(self.user_id, product).await?;

        self.fetch_and_replace().await
    }

    async fn fetch_and_replace(&self) -> Result<Vec<CartLineItem>, CartViewError> {
        let cart = self.client.get_cart(self.user_id).await?;

        let mut items = self.items.write().await;
        *items = cart.items;

        Ok(items.clone())
    }

    fn schedule_settle_refresh(&self) {
        let client = Arc::clone(&self.client);
        let items = Arc::clone(&self.items);
        let user = self.user_id;
        let delay = self.settle_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            match client.get_cart(user).await {
                Ok(cart) => *items.write().await = cart.items,
                Err(error) => {
                    warn!(user = %user, error = %error, "settle re-fetch failed; keeping local view");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use atelier::records::ProductId;

    use crate::test::TestContext;

    use super::*;

    fn view(ctx: &TestContext, user: UserId) -> CartView {
        CartView::with_settle_delay(ctx.store_client(), user, Duration::ZERO)
    }

    #[tokio::test]
    async fn update_quantity_is_applied_before_the_remote_call_resolves() {
        let ctx = TestContext::new();
        let user = UserId::from_u64(1);
        let ids = ctx.seed_cart(user, &[(3, 2)]).await;

        let view = view(&ctx, user);
        view.refresh().await.expect("refresh should succeed");

        // Fail the remote update: the optimistic write must still be visible.
        ctx.store.fail("update_cart_item_quantity").await;

        let result = view.update_quantity(ids[0], 7).await;

        assert!(
            matches!(result, Err(CartViewError::Store(_))),
            "remote failure is surfaced, got {result:?}"
        );
        assert_eq!(
            view.items().await[0].quantity,
            7,
            "optimistic view is not rolled back on failure"
        );
        assert_eq!(
            ctx.store.cart_items(user).await[0].quantity,
            2,
            "remote cart is unchanged"
        );
    }

    #[tokio::test]
    async fn update_quantity_settles_to_the_remote_state() {
        let ctx = TestContext::new();
        let user = UserId::from_u64(1);
        let ids = ctx.seed_cart(user, &[(3, 2)]).await;

        let view = view(&ctx, user);
        view.refresh().await.expect("refresh should succeed");

        let items = view
            .update_quantity(ids[0], 5)
            .await
            .expect("update should succeed");

        assert_eq!(items[0].quantity, 5, "returned view is optimistic");

        // Let the zero-delay settle task run.
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(
            view.items().await[0].quantity,
            5,
            "settled view matches the remote cart"
        );
        assert_eq!(ctx.store.cart_items(user).await[0].quantity, 5);
    }

    #[tokio::test]
    async fn failed_view_converges_on_next_successful_refresh() {
        let ctx = TestContext::new();
        let user = UserId::from_u64(1);
        let ids = ctx.seed_cart(user, &[(3, 2)]).await;

        let view = view(&ctx, user);
        view.refresh().await.expect("refresh should succeed");

        ctx.store.fail("update_cart_item_quantity").await;
        let _ = view.update_quantity(ids[0], 9).await;
        ctx.store.clear_failures().await;

        let items = view.refresh().await.expect("refresh should succeed");

        assert_eq!(
            items[0].quantity, 2,
            "known-good remote state replaces the stale optimistic view"
        );
    }

    #[tokio::test]
    async fn add_item_updates_the_view_only_after_the_remote_call() {
        let ctx = TestContext::new();
        let user = UserId::from_u64(1);

        let view = view(&ctx, user);
        view.refresh().await.expect("refresh should succeed");

        ctx.store.fail("add_cart_item").await;

        let result = view
            .add_item(NewCartItem {
                product_id: ProductId::from_u64(3),
                quantity: 1,
                color: None,
                size: None,
            })
            .await;

        assert!(result.is_err(), "remote failure is surfaced");
        assert!(
            view.items().await.is_empty(),
            "no optimistic write for additions"
        );

        ctx.store.clear_failures().await;

        let items = view
            .add_item(NewCartItem {
                product_id: ProductId::from_u64(3),
                quantity: 1,
                color: None,
                size: None,
            })
            .await
            .expect("add should succeed");

        assert_eq!(items.len(), 1, "view reflects the resolved remote state");
    }

    #[tokio::test]
    async fn remove_item_updates_the_view_from_a_fresh_read() {
        let ctx = TestContext::new();
        let user = UserId::from_u64(1);
        ctx.seed_cart(user, &[(3, 2), (4, 1)]).await;

        let view = view(&ctx, user);
        view.refresh().await.expect("refresh should succeed");

        let items = view
            .remove_item(ProductId::from_u64(3))
            .await
            .expect("remove should succeed");

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_id, ProductId::from_u64(4));
    }

    #[tokio::test]
    async fn concurrent_mutations_are_rejected() {
        let ctx = TestContext::new();
        let user = UserId::from_u64(1);
        let ids = ctx.seed_cart(user, &[(3, 2)]).await;

        let view = view(&ctx, user);
        view.refresh().await.expect("refresh should succeed");

        let held = view.gate.try_lock().expect("gate should be free");

        let result = view.update_quantity(ids[0], 4).await;

        assert!(
            matches!(result, Err(CartViewError::Busy)),
            "in-flight guard rejects, got {result:?}"
        );

        drop(held);

        view.update_quantity(ids[0], 4)
            .await
            .expect("update should succeed once the guard is free");
    }
}
