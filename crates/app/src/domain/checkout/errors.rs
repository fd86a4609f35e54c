//! Checkout errors.
//!
//! The variants distinguish what the caller can do next: a `RolledBack`
//! failure left the cart exactly as captured and the whole operation can be
//! retried; a `FatalInconsistency` left the cart diverged and requires
//! manual reconciliation.

use thiserror::Error;

use crate::{
    client::StoreError,
    domain::checkout::models::{CheckoutState, OrderId},
};

#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Input validation failed. No remote call was made.
    #[error("checkout input invalid: {0}")]
    InvalidInput(String),

    /// Another checkout transaction for this user is still outstanding.
    #[error("another checkout is already in progress for this user")]
    InProgress,

    /// The pre-checkout cart read failed. No remote mutation was made.
    #[error("failed to capture cart snapshot")]
    SnapshotCapture(#[source] StoreError),

    /// Order creation failed on the full-cart path. The cart was never
    /// touched by the client, so there is nothing to restore.
    #[error("order creation failed")]
    OrderCreation(#[source] StoreError),

    /// A transaction step failed and the compensating restore succeeded:
    /// the cart again holds the captured snapshot's contents.
    #[error("checkout failed during {state}; the cart was restored to its pre-checkout contents")]
    RolledBack {
        state: CheckoutState,
        #[source]
        source: StoreError,
    },

    /// A restore failed, leaving the cart diverged from both the
    /// pre-checkout and post-order states.
    #[error("checkout failed during {state} and the cart could not be restored; manual reconciliation required")]
    FatalInconsistency {
        /// The step whose failure (or, for post-order restoration, whose
        /// replay) put the cart into the diverged state.
        state: CheckoutState,
        /// The step failure that triggered the restore, when one did.
        step_error: Option<StoreError>,
        /// The failure of the restore itself.
        #[source]
        restore: StoreError,
        /// The created order, when one exists despite the failure.
        order_id: Option<OrderId>,
    },
}
