//! Catalog service errors.

use thiserror::Error;

use crate::client::StoreError;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// The pre-planning read of the remote collection failed. Nothing was
    /// mutated; the edit can simply be retried.
    #[error("failed to fetch current remote state")]
    Fetch(#[source] StoreError),
}
