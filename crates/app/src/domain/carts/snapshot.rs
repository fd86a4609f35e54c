//! Cart Snapshots
//!
//! Captures an immutable copy of a user's remote cart and replays it. The
//! snapshot is the rollback target of the checkout transaction: replay is a
//! best-effort re-add of the captured line items in their original order,
//! with no re-validation against current stock. The store assigns fresh line
//! item ids on replay.

use std::sync::Arc;

use jiff::Timestamp;

use crate::{
    client::{StoreClient, StoreError},
    domain::carts::models::{CartItemId, CartSnapshot, UserId},
};

/// Captures and replays cart snapshots through the store client.
#[derive(Clone)]
pub struct CartSnapshots {
    client: Arc<dyn StoreClient>,
}

impl CartSnapshots {
    #[must_use]
    pub fn new(client: Arc<dyn StoreClient>) -> Self {
        Self { client }
    }

    /// Read the user's current cart and freeze it.
    ///
    /// Performs exactly one read, never caches: the snapshot must reflect
    /// the cart at the instant checkout begins.
    ///
    /// # Errors
    ///
    /// Returns an error when the cart read fails; the caller must not
    /// proceed to any mutating step.
    pub async fn capture(&self, user: UserId) -> Result<CartSnapshot, StoreError> {
        let cart = self.client.get_cart(user).await?;

        Ok(CartSnapshot {
            cart_id: cart.cart_id,
            user_id: cart.user_id,
            items: cart.items,
            captured_at: Timestamp::now(),
        })
    }

    /// Clear the remote cart and replay the snapshot verbatim.
    ///
    /// # Errors
    ///
    /// Returns the first failing remote call; items already re-added stay.
    pub async fn restore(&self, snapshot: &CartSnapshot) -> Result<(), StoreError> {
        self.client.clear_cart(snapshot.user_id).await?;

        for item in &snapshot.items {
            self.client
                .add_cart_item(snapshot.user_id, item.to_new_item())
                .await?;
        }

        Ok(())
    }

    /// Replay the snapshot into the already-empty cart, skipping the target
    /// line item. Used after a successful order, once the store has cleared
    /// the cart.
    ///
    /// # Errors
    ///
    /// Returns the first failing remote call; items already re-added stay.
    pub async fn restore_without(
        &self,
        snapshot: &CartSnapshot,
        target: CartItemId,
    ) -> Result<(), StoreError> {
        for item in snapshot.items.iter().filter(|i| i.cart_item_id != target) {
            self.client
                .add_cart_item(snapshot.user_id, item.to_new_item())
                .await?;
        }

        Ok(())
    }
}
