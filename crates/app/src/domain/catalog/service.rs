//! Catalog Service
//!
//! Reconciles a product's stock variants and images against the state an
//! admin edit form now specifies: one authoritative read, a pure plan, then
//! the planned creates and deletes. The store offers no atomicity, so a
//! failure partway through application is reported as a degraded success —
//! the remote collection holds a mixture of old and new state and the
//! report says which operations failed.

use std::sync::Arc;

use async_trait::async_trait;
use atelier::{
    reconcile::{ReconciliationPlan, reconcile},
    records::{ImageRecord, ProductId, Variant, VariantKey},
};
use mockall::automock;
use tracing::{Span, info, warn};

use crate::{
    client::{StoreClient, StoreError},
    domain::catalog::errors::CatalogError,
};

/// One failed operation of an applied plan.
#[derive(Debug)]
pub enum ApplyFailure {
    /// The batched create call failed; none of the planned records were
    /// created.
    CreateBatch { count: usize, source: StoreError },

    /// One delete failed; the record is still in the remote collection.
    Delete { remote_id: u64, source: StoreError },
}

/// Outcome of applying a reconciliation plan.
///
/// An empty `failures` list is a clean success. A non-empty list is a
/// degraded success: the surviving part of the edit went through and the
/// listed operations must be fixed manually or by re-running the edit.
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub created: usize,
    pub deleted: usize,
    pub kept: usize,
    pub failures: Vec<ApplyFailure>,
}

impl ApplyReport {
    /// True when some planned operations failed.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[derive(Clone)]
pub struct StoreCatalogService {
    client: Arc<dyn StoreClient>,
}

impl StoreCatalogService {
    #[must_use]
    pub fn new(client: Arc<dyn StoreClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CatalogService for StoreCatalogService {
    #[tracing::instrument(
        name = "catalog.replace_variants",
        skip(self, desired),
        fields(
            product_id = %product,
            to_create = tracing::field::Empty,
            to_delete = tracing::field::Empty,
            to_keep = tracing::field::Empty
        ),
        err
    )]
    async fn replace_variants(
        &self,
        product: ProductId,
        desired: Vec<VariantKey>,
    ) -> Result<ApplyReport, CatalogError> {
        let remote = self
            .client
            .get_variants(product)
            .await
            .map_err(CatalogError::Fetch)?;

        let desired: Vec<Variant> = desired
            .into_iter()
            .map(|key| Variant::desired(product, key))
            .collect();

        let plan = reconcile(&remote, &desired);

        record_plan_counts(&plan);

        Ok(self.apply_variant_plan(plan).await)
    }

    async fn apply_variant_plan(&self, plan: ReconciliationPlan<Variant>) -> ApplyReport {
        let mut report = ApplyReport {
            kept: plan.to_keep.len(),
            ..ApplyReport::default()
        };

        if !plan.to_create.is_empty() {
            match self.client.create_variants_batch(&plan.to_create).await {
                Ok(()) => report.created = plan.to_create.len(),
                Err(source) => report.failures.push(ApplyFailure::CreateBatch {
                    count: plan.to_create.len(),
                    source,
                }),
            }
        }

        for id in plan.to_delete {
            match self.client.delete_variant(id).await {
                Ok(()) => report.deleted += 1,
                Err(source) => report.failures.push(ApplyFailure::Delete {
                    remote_id: id.into_u64(),
                    source,
                }),
            }
        }

        report_applied("variants", &report);

        report
    }

    #[tracing::instrument(
        name = "catalog.replace_images",
        skip(self, desired),
        fields(
            product_id = %product,
            to_create = tracing::field::Empty,
            to_delete = tracing::field::Empty,
            to_keep = tracing::field::Empty
        ),
        err
    )]
    async fn replace_images(
        &self,
        product: ProductId,
        desired: Vec<String>,
    ) -> Result<ApplyReport, CatalogError> {
        let remote = self
            .client
            .get_images(product)
            .await
            .map_err(CatalogError::Fetch)?;

        let desired: Vec<ImageRecord> = desired
            .into_iter()
            .map(|url| ImageRecord::desired(product, url))
            .collect();

        let plan = reconcile(&remote, &desired);

        record_plan_counts(&plan);

        Ok(self.apply_image_plan(plan).await)
    }

    async fn apply_image_plan(&self, plan: ReconciliationPlan<ImageRecord>) -> ApplyReport {
        let mut report = ApplyReport {
            kept: plan.to_keep.len(),
            ..ApplyReport::default()
        };

        if !plan.to_create.is_empty() {
            match self.client.create_images_batch(&plan.to_create).await {
                Ok(()) => report.created = plan.to_create.len(),
                Err(source) => report.failures.push(ApplyFailure::CreateBatch {
                    count: plan.to_create.len(),
                    source,
                }),
            }
        }

        for id in plan.to_delete {
            match self.client.delete_image(id).await {
                Ok(()) => report.deleted += 1,
                Err(source) => report.failures.push(ApplyFailure::Delete {
                    remote_id: id.into_u64(),
                    source,
                }),
            }
        }

        report_applied("images", &report);

        report
    }
}

fn record_plan_counts<R: atelier::reconcile::Reconcilable>(plan: &ReconciliationPlan<R>) {
    let span = Span::current();

    span.record("to_create", plan.to_create.len());
    span.record("to_delete", plan.to_delete.len());
    span.record("to_keep", plan.to_keep.len());
}

fn report_applied(collection: &str, report: &ApplyReport) {
    if report.is_degraded() {
        warn!(
            collection,
            created = report.created,
            deleted = report.deleted,
            kept = report.kept,
            failed = report.failures.len(),
            "plan applied with failures; remote state is mixed"
        );
    } else {
        info!(
            collection,
            created = report.created,
            deleted = report.deleted,
            kept = report.kept,
            "plan applied"
        );
    }
}

/// Diff-based replacement of a product's keyed sub-resources.
#[automock]
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Make the product's remote variant set match the given keys. Variants
    /// whose key survives keep their remote stock and availability.
    async fn replace_variants(
        &self,
        product: ProductId,
        desired: Vec<VariantKey>,
    ) -> Result<ApplyReport, CatalogError>;

    /// Issue the planned variant creates and deletes.
    async fn apply_variant_plan(&self, plan: ReconciliationPlan<Variant>) -> ApplyReport;

    /// Make the product's remote image set match the given URLs.
    async fn replace_images(
        &self,
        product: ProductId,
        desired: Vec<String>,
    ) -> Result<ApplyReport, CatalogError>;

    /// Issue the planned image creates and deletes.
    async fn apply_image_plan(&self, plan: ReconciliationPlan<ImageRecord>) -> ApplyReport;
}
