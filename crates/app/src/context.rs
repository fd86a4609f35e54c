//! App Context

use std::sync::Arc;

use thiserror::Error;

use crate::{
    client::{HttpStoreClient, StoreClient, StoreConfig},
    domain::{
        carts::{CartView, models::UserId},
        catalog::{CatalogService, StoreCatalogService},
        checkout::{CheckoutService, StoreCheckoutService},
    },
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to build http client")]
    Client(#[source] reqwest::Error),
}

#[derive(Clone)]
pub struct AppContext {
    pub client: Arc<dyn StoreClient>,
    pub checkout: Arc<dyn CheckoutService>,
    pub catalog: Arc<dyn CatalogService>,
}

impl AppContext {
    /// Build the application context from store configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn from_config(config: StoreConfig) -> Result<Self, AppInitError> {
        let client: Arc<dyn StoreClient> =
            Arc::new(HttpStoreClient::from_config(config).map_err(AppInitError::Client)?);

        Ok(Self {
            checkout: Arc::new(StoreCheckoutService::new(Arc::clone(&client))),
            catalog: Arc::new(StoreCatalogService::new(Arc::clone(&client))),
            client,
        })
    }

    /// A fresh optimistic view of the given user's cart.
    #[must_use]
    pub fn cart_view(&self, user: UserId) -> CartView {
        CartView::new(Arc::clone(&self.client), user)
    }
}
