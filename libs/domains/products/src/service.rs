//! Product lifecycle: create, update and delete across the two stores
//!
//! The stores are independent and there is no transaction spanning them.
//! Consistency rests on ordering alone: the image is uploaded before any
//! document write, and on delete the blob is released before the document.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;
use validator::Validate;

use crate::error::{ProductError, ProductResult};
use crate::models::{DataUrl, Owner, Product, ProductDraft};
use crate::repository::{BlobStore, DocumentStore};

/// Outcome of a completed delete.
///
/// The document is gone; `blob_warning` carries the blob-store error, if any,
/// that was tolerated along the way.
#[derive(Debug, Default)]
pub struct DeleteReport {
    pub blob_warning: Option<ProductError>,
}

impl DeleteReport {
    /// Both the image and the document were released
    pub fn is_clean(&self) -> bool {
        self.blob_warning.is_none()
    }
}

/// Sequences product writes against a document store and a blob store.
///
/// Holds no per-product state; the owner is passed into every call.
pub struct ProductLifecycle<D: DocumentStore, B: BlobStore> {
    documents: Arc<D>,
    blobs: Arc<B>,
    /// Last timestamp handed out for an image path, shared by clones
    last_image_ms: Arc<AtomicI64>,
}

impl<D: DocumentStore, B: BlobStore> ProductLifecycle<D, B> {
    pub fn new(documents: D, blobs: B) -> Self {
        Self::from_shared(Arc::new(documents), Arc::new(blobs))
    }

    /// Build from stores that are also used elsewhere
    pub fn from_shared(documents: Arc<D>, blobs: Arc<B>) -> Self {
        Self {
            documents,
            blobs,
            last_image_ms: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn documents(&self) -> &D {
        &self.documents
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    /// Upload the draft's image, then insert the product document.
    ///
    /// A failed upload leaves no document behind. A failed insert leaves the
    /// uploaded image orphaned; that gap is reported, not rolled back.
    #[instrument(skip(self, draft), fields(owner = %owner, product_name = %draft.name))]
    pub async fn create(&self, owner: &Owner, draft: ProductDraft) -> ProductResult<Product> {
        draft.validate()?;

        let payload = DataUrl::parse(&draft.image)?;
        let image_path = owner.image_path(self.next_image_timestamp());
        let image_url = self.blobs.upload(&image_path, &payload).await?;

        let body = draft.into_payload(image_url);
        let id = self
            .documents
            .insert(&owner.products_path(), body.clone())
            .await
            .inspect_err(|e| {
                tracing::warn!(image_path = %image_path, error = %e, "Insert failed, uploaded image is orphaned");
            })?;

        tracing::info!(product_id = %id, "Product created");
        Ok(Product::from_payload(id, body))
    }

    /// Rewrite an existing product.
    ///
    /// A changed image is uploaded over the existing blob, reusing its path.
    /// An unchanged image is never re-uploaded. Any image failure aborts
    /// before the document is touched.
    #[instrument(skip(self, existing, draft), fields(owner = %owner, product_id = %existing.id))]
    pub async fn update(
        &self,
        owner: &Owner,
        existing: &Product,
        draft: ProductDraft,
    ) -> ProductResult<Product> {
        draft.validate()?;

        let image_url = if draft.image != existing.image {
            let payload = DataUrl::parse(&draft.image)?;
            let image_path = self.blobs.resolve_path(&existing.image)?;
            self.blobs.upload(&image_path, &payload).await?
        } else {
            existing.image.clone()
        };

        let body = draft.into_payload(image_url);
        self.documents
            .replace(&owner.product_path(&existing.id), body.clone())
            .await?;

        tracing::info!("Product updated");
        Ok(Product::from_payload(existing.id.clone(), body))
    }

    /// Release the product's image, then remove its document.
    ///
    /// Blob-store failures (including an image URL that cannot be resolved)
    /// do not stop the document removal; they come back in the report.
    /// Deleting an already deleted product succeeds.
    #[instrument(skip(self, product), fields(owner = %owner, product_id = %product.id))]
    pub async fn delete(&self, owner: &Owner, product: &Product) -> ProductResult<DeleteReport> {
        let blob_warning = match self.blobs.resolve_path(&product.image) {
            Ok(image_path) => self.blobs.remove(&image_path).await.err(),
            Err(e) => Some(e),
        };
        if let Some(ref warning) = blob_warning {
            tracing::warn!(error = %warning, "Image not released, removing document anyway");
        }

        self.documents
            .remove(&owner.product_path(&product.id))
            .await?;

        tracing::info!("Product deleted");
        Ok(DeleteReport { blob_warning })
    }
}

impl<D: DocumentStore, B: BlobStore> ProductLifecycle<D, B> {
    /// Current time in milliseconds, bumped past the last value issued so two
    /// creates never share an image path
    fn next_image_timestamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last_image_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }
}

impl<D: DocumentStore, B: BlobStore> Clone for ProductLifecycle<D, B> {
    fn clone(&self) -> Self {
        Self {
            documents: Arc::clone(&self.documents),
            blobs: Arc::clone(&self.blobs),
            last_image_ms: Arc::clone(&self.last_image_ms),
        }
    }
}
