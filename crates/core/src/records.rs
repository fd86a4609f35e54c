//! Catalog Records
//!
//! Keyed sub-resources of a product: stock variants identified by their
//! (size, color) pair and images identified by their exact URL.

use serde::{Deserialize, Serialize};

use crate::{ids::TypedId, reconcile::Reconcilable};

/// Marker for product identifiers. The planning core holds products by
/// reference only.
#[derive(Debug, Clone, Copy)]
pub struct ProductRef;

/// Product identifier.
pub type ProductId = TypedId<ProductRef>;

/// Stock variant identifier.
pub type VariantId = TypedId<Variant>;

/// Product image identifier.
pub type ImageId = TypedId<ImageRecord>;

/// Composite identity of a stock variant within a product.
///
/// Comparison is exact and case-sensitive. Changing either component is a
/// delete of the old variant and a create of a new one, never an update.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantKey {
    pub size: String,
    pub color: String,
}

impl VariantKey {
    /// Build a key from its components.
    pub fn new(size: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            size: size.into(),
            color: color.into(),
        }
    }
}

/// A (size, color) stock-keeping unit.
///
/// `quantity` and `availability` are owned by the remote store; the client
/// only ever supplies the creation defaults of `0` and `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    #[serde(rename = "id", skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<VariantId>,
    pub product_id: ProductId,
    pub size: String,
    pub color: String,
    pub quantity: u32,
    pub availability: bool,
}

impl Variant {
    /// A desired-state record carrying identity only, as edit forms supply
    /// it. Remote-owned fields start at their creation defaults.
    #[must_use]
    pub fn desired(product_id: ProductId, key: VariantKey) -> Self {
        Self {
            remote_id: None,
            product_id,
            size: key.size,
            color: key.color,
            quantity: 0,
            availability: true,
        }
    }
}

impl Reconcilable for Variant {
    type Key = VariantKey;
    type RemoteId = VariantId;

    fn key(&self) -> VariantKey {
        VariantKey {
            size: self.size.clone(),
            color: self.color.clone(),
        }
    }

    fn remote_id(&self) -> Option<VariantId> {
        self.remote_id
    }

    fn materialize(&self) -> Self {
        Self {
            remote_id: None,
            product_id: self.product_id,
            size: self.size.clone(),
            color: self.color.clone(),
            quantity: 0,
            availability: true,
        }
    }
}

/// A product image held by the remote store.
///
/// Identity is the exact URL string; no normalization is applied, so two
/// URLs differing only in case are two images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    #[serde(rename = "imageId", skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<ImageId>,
    pub product_id: ProductId,
    #[serde(rename = "imageUrl")]
    pub url: String,
}

impl ImageRecord {
    /// A desired-state record for an image the form now lists.
    pub fn desired(product_id: ProductId, url: impl Into<String>) -> Self {
        Self {
            remote_id: None,
            product_id,
            url: url.into(),
        }
    }
}

impl Reconcilable for ImageRecord {
    type Key = String;
    type RemoteId = ImageId;

    fn key(&self) -> String {
        self.url.clone()
    }

    fn remote_id(&self) -> Option<ImageId> {
        self.remote_id
    }

    fn materialize(&self) -> Self {
        Self {
            remote_id: None,
            product_id: self.product_id,
            url: self.url.clone(),
        }
    }
}
