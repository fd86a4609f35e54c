//! Checkout Service
//!
//! Emulates transactional checkout against a store that only offers
//! independent CRUD calls. Single-item checkout is a compensating
//! transaction: the cart is temporarily reduced to the target item so the
//! whole-cart order endpoint orders exactly that item, then the remaining
//! items are replayed from the snapshot. Every side-effecting step has one
//! designated compensating action; intermediate states are externally
//! visible, which the design accepts for a short, user-initiated sequence.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use rustc_hash::FxHashMap;
use tokio::sync::Mutex;
use tracing::{Span, info, warn};
use uuid::Uuid;

use crate::{
    client::{StoreClient, StoreError},
    domain::{
        carts::{
            models::{CartItemId, CartLineItem, CartSnapshot, UserId},
            snapshot::CartSnapshots,
        },
        checkout::{
            errors::CheckoutError,
            models::{
                CheckoutReceipt, CheckoutState, Order, OrderForm, PaymentMethod, PaymentSlip,
                SlipOutcome,
            },
        },
    },
};

type UserGates = FxHashMap<UserId, Arc<Mutex<()>>>;

#[derive(Clone)]
pub struct StoreCheckoutService {
    client: Arc<dyn StoreClient>,
    snapshots: CartSnapshots,
    gates: Arc<Mutex<UserGates>>,
}

impl StoreCheckoutService {
    #[must_use]
    pub fn new(client: Arc<dyn StoreClient>) -> Self {
        Self {
            snapshots: CartSnapshots::new(Arc::clone(&client)),
            client,
            gates: Arc::new(Mutex::new(UserGates::default())),
        }
    }

    /// At most one checkout transaction per user. Rejects, never queues.
    async fn acquire_gate(
        &self,
        user: UserId,
    ) -> Result<tokio::sync::OwnedMutexGuard<()>, CheckoutError> {
        let gate = {
            let mut gates = self.gates.lock().await;
            Arc::clone(gates.entry(user).or_default())
        };

        gate.try_lock_owned().map_err(|_| CheckoutError::InProgress)
    }

    fn validate(
        form: &OrderForm,
        user: UserId,
        slip: Option<&PaymentSlip>,
    ) -> Result<(), CheckoutError> {
        if form.user_id != user {
            return Err(CheckoutError::InvalidInput(
                "order form names a different user".to_string(),
            ));
        }

        form.validate().map_err(CheckoutError::InvalidInput)?;

        match (form.payment_method, slip) {
            (PaymentMethod::PaymentSlip, None) => Err(CheckoutError::InvalidInput(
                "payment slip is required for this payment method".to_string(),
            )),
            (_, Some(slip)) => slip.validate().map_err(CheckoutError::InvalidInput),
            (_, None) => Ok(()),
        }
    }

    /// Clear the remote cart and re-add only the target item, so that the
    /// whole-cart order endpoint sees a single-item cart.
    async fn isolate(
        &self,
        snapshot: &CartSnapshot,
        target: &CartLineItem,
    ) -> Result<(), StoreError> {
        self.client.clear_cart(snapshot.user_id).await?;

        self.client
            .add_cart_item(snapshot.user_id, target.to_new_item())
            .await?;

        Ok(())
    }

    /// Compensate a failed step by replaying the snapshot verbatim.
    async fn roll_back(
        &self,
        state: CheckoutState,
        source: StoreError,
        snapshot: &CartSnapshot,
    ) -> CheckoutError {
        warn!(state = %state, error = %source, "checkout step failed; restoring cart from snapshot");

        match self.snapshots.restore(snapshot).await {
            Ok(()) => CheckoutError::RolledBack { state, source },
            Err(restore) => CheckoutError::FatalInconsistency {
                state,
                step_error: Some(source),
                restore,
                order_id: None,
            },
        }
    }

    /// Optional slip step. Never unwinds: the order already exists.
    async fn submit_slip(&self, order: &Order, slip: Option<PaymentSlip>) -> SlipOutcome {
        match slip {
            None => SlipOutcome::NotRequested,
            Some(slip) => match self.client.submit_payment_slip(order.order_id, &slip).await {
                Ok(()) => SlipOutcome::Submitted,
                Err(error) => {
                    warn!(
                        order_id = %order.order_id,
                        error = %error,
                        "payment slip submission failed; order stands"
                    );

                    SlipOutcome::Failed(error)
                }
            },
        }
    }
}

#[async_trait]
impl CheckoutService for StoreCheckoutService {
    #[tracing::instrument(
        name = "checkout.single_item",
        skip(self, form, slip),
        fields(
            user_id = %user,
            cart_item = %target,
            transaction = tracing::field::Empty,
            order_id = tracing::field::Empty
        ),
        err
    )]
    async fn checkout_single_item(
        &self,
        user: UserId,
        target: CartItemId,
        form: OrderForm,
        slip: Option<PaymentSlip>,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let span = Span::current();

        span.record("transaction", tracing::field::display(Uuid::now_v7()));

        // Init
        Self::validate(&form, user, slip.as_ref())?;

        let _gate = self.acquire_gate(user).await?;

        // SnapshotTaken
        let snapshot = self
            .snapshots
            .capture(user)
            .await
            .map_err(CheckoutError::SnapshotCapture)?;

        let Some(target_item) = snapshot
            .items
            .iter()
            .find(|item| item.cart_item_id == target)
            .cloned()
        else {
            return Err(CheckoutError::InvalidInput(format!(
                "cart item {target} is not in the cart"
            )));
        };

        // Isolated
        if let Err(source) = self.isolate(&snapshot, &target_item).await {
            return Err(self
                .roll_back(CheckoutState::Isolated, source, &snapshot)
                .await);
        }

        // OrderCreated
        let order = match self.client.create_order(&form).await {
            Ok(order) => order,
            Err(source) => {
                // A partially created order, if any, is left as-is; only the
                // cart is compensated.
                return Err(self
                    .roll_back(CheckoutState::OrderCreated, source, &snapshot)
                    .await);
            }
        };

        span.record("order_id", tracing::field::display(order.order_id));
        info!(order_id = %order.order_id, "order created for isolated item");

        // SlipSubmitted
        let slip_outcome = self.submit_slip(&order, slip).await;

        // Restored — the store cleared the cart on order success; replay
        // everything except the ordered item, in original order.
        if let Err(restore) = self.snapshots.restore_without(&snapshot, target).await {
            return Err(CheckoutError::FatalInconsistency {
                state: CheckoutState::Restored,
                step_error: None,
                restore,
                order_id: Some(order.order_id),
            });
        }

        info!("cart restored to pre-checkout contents minus the ordered item");

        Ok(CheckoutReceipt {
            order,
            slip: slip_outcome,
        })
    }

    #[tracing::instrument(
        name = "checkout.full_cart",
        skip(self, form, slip),
        fields(user_id = %user, order_id = tracing::field::Empty),
        err
    )]
    async fn checkout_full_cart(
        &self,
        user: UserId,
        form: OrderForm,
        slip: Option<PaymentSlip>,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        // Init
        Self::validate(&form, user, slip.as_ref())?;

        let _gate = self.acquire_gate(user).await?;

        let cart = self
            .client
            .get_cart(user)
            .await
            .map_err(CheckoutError::SnapshotCapture)?;

        if cart.items.is_empty() {
            return Err(CheckoutError::InvalidInput(
                "cannot create an order from an empty cart".to_string(),
            ));
        }

        // OrderCreated — acts directly on the existing cart; the store
        // clears it on success, so there is nothing to isolate or restore.
        let order = self
            .client
            .create_order(&form)
            .await
            .map_err(CheckoutError::OrderCreation)?;

        Span::current().record("order_id", tracing::field::display(order.order_id));
        info!(order_id = %order.order_id, "order created for full cart");

        // SlipSubmitted
        let slip_outcome = self.submit_slip(&order, slip).await;

        Ok(CheckoutReceipt {
            order,
            slip: slip_outcome,
        })
    }
}

/// Transactional checkout over the non-transactional store.
#[automock]
#[async_trait]
pub trait CheckoutService: Send + Sync {
    /// Order exactly one cart line item, leaving the rest of the cart as it
    /// was. On failure the cart is restored from the pre-checkout snapshot.
    async fn checkout_single_item(
        &self,
        user: UserId,
        target: CartItemId,
        form: OrderForm,
        slip: Option<PaymentSlip>,
    ) -> Result<CheckoutReceipt, CheckoutError>;

    /// Order the whole current cart. The store clears the cart on success.
    async fn checkout_full_cart(
        &self,
        user: UserId,
        form: OrderForm,
        slip: Option<PaymentSlip>,
    ) -> Result<CheckoutReceipt, CheckoutError>;
}
