//! Cart view errors.

use thiserror::Error;

use crate::client::StoreError;

#[derive(Debug, Error)]
pub enum CartViewError {
    /// Another mutation on this cart is still in flight. Mutations are
    /// rejected rather than queued.
    #[error("another cart operation is in flight")]
    Busy,

    /// The remote call failed. For quantity updates the optimistic view is
    /// intentionally left in place.
    #[error("store request failed")]
    Store(#[from] StoreError),
}
