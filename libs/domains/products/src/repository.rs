use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::ProductResult;
use crate::models::{BlobPath, CollectionPath, DataUrl, DocumentPath, OrderBy, Product, ProductPayload};

/// Lazily yielded query results
pub type ProductStream = BoxStream<'static, ProductResult<Product>>;

/// Path-addressed access to the product documents.
///
/// Implementations talk to the remote store directly: no caching and no
/// internal retries. The caller decides what to do with a failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents under `path` in the requested order.
    ///
    /// Fails with `StoreUnavailable` when the backend cannot be reached.
    async fn query(&self, path: &CollectionPath, order: OrderBy) -> ProductResult<ProductStream>;

    /// Create a document under `path` and return its store-assigned identifier
    async fn insert(&self, path: &CollectionPath, data: ProductPayload) -> ProductResult<String>;

    /// Overwrite the document at `path`; `NotFound` if it does not exist
    async fn replace(&self, path: &DocumentPath, data: ProductPayload) -> ProductResult<()>;

    /// Delete the document at `path`. Removing a missing document succeeds.
    async fn remove(&self, path: &DocumentPath) -> ProductResult<()>;
}

/// Binary asset storage for product images
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Map a public URL issued by this store back to its internal path.
    ///
    /// Fails with `InvalidReference` for URLs this store did not issue.
    fn resolve_path(&self, public_url: &str) -> ProductResult<BlobPath>;

    /// Store `payload` at `path`, silently replacing any existing blob there,
    /// and return its public URL
    async fn upload(&self, path: &BlobPath, payload: &DataUrl) -> ProductResult<String>;

    /// Delete the blob at `path`. Removing a missing blob succeeds.
    async fn remove(&self, path: &BlobPath) -> ProductResult<()>;
}
