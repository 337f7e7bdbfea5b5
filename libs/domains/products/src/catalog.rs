//! In-memory listing of one owner's catalog

use futures_util::TryStreamExt;
use tracing::instrument;

use crate::editor::{EditOutcome, EditSession};
use crate::error::{ProductError, ProductResult};
use crate::models::{OrderBy, Owner, Product};
use crate::report::{self, ReportDocument};
use crate::repository::{BlobStore, DocumentStore};
use crate::service::{DeleteReport, ProductLifecycle};

/// Ordered product list plus the projections derived from it.
///
/// The list only changes on a successful refresh (full replace) or a
/// successful delete (single eviction).
pub struct CatalogController<D: DocumentStore, B: BlobStore> {
    lifecycle: ProductLifecycle<D, B>,
    order: OrderBy,
    products: Vec<Product>,
}

impl<D: DocumentStore, B: BlobStore> CatalogController<D, B> {
    /// Empty catalog listing best sellers first
    pub fn new(lifecycle: ProductLifecycle<D, B>) -> Self {
        Self {
            lifecycle,
            order: OrderBy::best_sellers(),
            products: Vec::new(),
        }
    }

    pub fn with_order(mut self, order: OrderBy) -> Self {
        self.order = order;
        self
    }

    pub fn lifecycle(&self) -> &ProductLifecycle<D, B> {
        &self.lifecycle
    }

    /// Reload the whole list. On failure the previous list is kept.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn refresh(&mut self, owner: &Owner) -> ProductResult<usize> {
        let products: Vec<Product> = self
            .lifecycle
            .documents()
            .query(&owner.products_path(), self.order)
            .await?
            .try_collect()
            .await?;

        self.products = products;
        tracing::debug!(count = self.products.len(), "Catalog refreshed");
        Ok(self.products.len())
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn find(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|product| product.id == id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Sum of price × sold units over the current list
    pub fn aggregate_profit(&self) -> f64 {
        self.products.iter().map(Product::profit).sum()
    }

    pub fn export_report(&self) -> ReportDocument {
        report::catalog_report(&self.products)
    }

    /// Drop one product from the list without touching the stores
    pub fn evict(&mut self, id: &str) -> Option<Product> {
        let index = self.products.iter().position(|product| product.id == id)?;
        Some(self.products.remove(index))
    }

    /// Delete a listed product from both stores, then evict it locally
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn delete(&mut self, owner: &Owner, id: &str) -> ProductResult<DeleteReport> {
        let product = self
            .find(id)
            .cloned()
            .ok_or_else(|| ProductError::NotFound(owner.product_path(id).to_string()))?;

        let report = self.lifecycle.delete(owner, &product).await?;
        self.evict(id);
        Ok(report)
    }

    /// Edit session for a new product, or for the listed product `id`
    pub fn edit_session(&self, owner: &Owner, id: Option<&str>) -> ProductResult<EditSession<D, B>> {
        let existing = match id {
            Some(id) => Some(
                self.find(id)
                    .cloned()
                    .ok_or_else(|| ProductError::NotFound(owner.product_path(id).to_string()))?,
            ),
            None => None,
        };
        Ok(EditSession::new(self.lifecycle.clone(), owner.clone(), existing))
    }

    /// React to a finished edit session: a commit triggers a full refresh
    pub async fn apply_outcome(&mut self, owner: &Owner, outcome: &EditOutcome) -> ProductResult<()> {
        match outcome {
            EditOutcome::Committed(_) => self.refresh(owner).await.map(|_| ()),
            EditOutcome::Cancelled => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlobPath, ProductField};
    use crate::repository::{MockBlobStore, MockDocumentStore};
    use futures_util::stream;

    fn product(id: &str, price: f64, sold_units: f64) -> Product {
        Product {
            id: id.into(),
            name: format!("Product {id}"),
            price,
            sold_units,
            image: format!("https://img/{id}"),
        }
    }

    fn documents_returning(products: Vec<Product>) -> MockDocumentStore {
        let mut documents = MockDocumentStore::new();
        documents.expect_query().returning(move |_, _| {
            let items: Vec<ProductResult<Product>> = products.clone().into_iter().map(Ok).collect();
            Ok(Box::pin(stream::iter(items)))
        });
        documents
    }

    fn catalog(documents: MockDocumentStore, blobs: MockBlobStore) -> CatalogController<MockDocumentStore, MockBlobStore> {
        CatalogController::new(ProductLifecycle::new(documents, blobs))
    }

    #[tokio::test]
    async fn test_refresh_replaces_list() {
        let owner = Owner::new("u1");
        let mut documents = MockDocumentStore::new();
        documents
            .expect_query()
            .withf(|path, order| {
                path.as_str() == "owners/u1/products" && *order == OrderBy::best_sellers()
            })
            .returning(|_, _| {
                Ok(Box::pin(stream::iter(vec![
                    Ok(product("a", 2.0, 10.0)),
                    Ok(product("b", 5.0, 1.0)),
                ])))
            });

        let mut catalog = catalog(documents, MockBlobStore::new());
        assert!(catalog.is_empty());

        let count = catalog.refresh(&owner).await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(catalog.products()[0].id, "a");
        assert!(catalog.find("b").is_some());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_list() {
        let owner = Owner::new("u1");
        let mut documents = MockDocumentStore::new();
        let mut calls = 0;
        documents.expect_query().returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Ok(Box::pin(stream::iter(vec![Ok(product("a", 1.0, 1.0))])))
            } else {
                Err(ProductError::StoreUnavailable("offline".into()))
            }
        });

        let mut catalog = catalog(documents, MockBlobStore::new());
        catalog.refresh(&owner).await.unwrap();
        let result = catalog.refresh(&owner).await;

        assert!(matches!(result, Err(ProductError::StoreUnavailable(_))));
        assert_eq!(catalog.len(), 1);
    }

    #[tokio::test]
    async fn test_stream_error_midway_keeps_previous_list() {
        let owner = Owner::new("u1");
        let mut documents = MockDocumentStore::new();
        let mut calls = 0;
        documents.expect_query().returning(move |_, _| {
            calls += 1;
            let items = if calls == 1 {
                vec![Ok(product("a", 1.0, 1.0))]
            } else {
                vec![
                    Ok(product("b", 1.0, 1.0)),
                    Err(ProductError::StoreUnavailable("cursor lost".into())),
                ]
            };
            Ok(Box::pin(stream::iter(items)))
        });

        let mut catalog = catalog(documents, MockBlobStore::new());
        catalog.refresh(&owner).await.unwrap();
        assert!(catalog.refresh(&owner).await.is_err());

        assert_eq!(catalog.products(), &[product("a", 1.0, 1.0)]);
    }

    #[tokio::test]
    async fn test_aggregate_profit() {
        let owner = Owner::new("u1");
        let mut catalog = catalog(
            documents_returning(vec![product("a", 2.0, 10.0), product("b", 5.0, 1.0)]),
            MockBlobStore::new(),
        );
        assert_eq!(catalog.aggregate_profit(), 0.0);

        catalog.refresh(&owner).await.unwrap();

        assert_eq!(catalog.aggregate_profit(), 25.0);
    }

    #[tokio::test]
    async fn test_export_report_of_empty_catalog() {
        let catalog = catalog(MockDocumentStore::new(), MockBlobStore::new());
        let report = catalog.export_report();

        assert_eq!(report.filename, "productos.pdf");
        assert_eq!(report.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_delete_evicts_only_the_deleted_product() {
        let owner = Owner::new("u1");
        let mut documents =
            documents_returning(vec![product("a", 1.0, 3.0), product("b", 1.0, 2.0)]);
        documents.expect_remove().times(1).returning(|_| Ok(()));
        let mut blobs = MockBlobStore::new();
        blobs
            .expect_resolve_path()
            .returning(|_| Ok(BlobPath::new("u1/1")));
        blobs.expect_remove().returning(|_| Ok(()));

        let mut catalog = catalog(documents, blobs);
        catalog.refresh(&owner).await.unwrap();
        let report = catalog.delete(&owner, "a").await.unwrap();

        assert!(report.is_clean());
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.products()[0].id, "b");
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_product_listed() {
        let owner = Owner::new("u1");
        let mut documents = documents_returning(vec![product("a", 1.0, 3.0)]);
        documents
            .expect_remove()
            .returning(|_| Err(ProductError::StoreUnavailable("offline".into())));
        let mut blobs = MockBlobStore::new();
        blobs
            .expect_resolve_path()
            .returning(|_| Ok(BlobPath::new("u1/1")));
        blobs.expect_remove().returning(|_| Ok(()));

        let mut catalog = catalog(documents, blobs);
        catalog.refresh(&owner).await.unwrap();

        assert!(catalog.delete(&owner, "a").await.is_err());
        assert!(catalog.find("a").is_some());
    }

    #[tokio::test]
    async fn test_delete_of_unlisted_product_is_not_found() {
        let mut catalog = catalog(MockDocumentStore::new(), MockBlobStore::new());
        let result = catalog.delete(&Owner::new("u1"), "missing").await;

        assert!(matches!(result, Err(ProductError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cancelled_outcome_does_not_refresh() {
        let mut documents = MockDocumentStore::new();
        documents.expect_query().times(0);

        let mut catalog = catalog(documents, MockBlobStore::new());
        catalog
            .apply_outcome(&Owner::new("u1"), &EditOutcome::Cancelled)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_committed_outcome_refreshes() {
        let owner = Owner::new("u1");
        let mut catalog = catalog(
            documents_returning(vec![product("a", 1.0, 1.0)]),
            MockBlobStore::new(),
        );

        catalog
            .apply_outcome(&owner, &EditOutcome::Committed(product("a", 1.0, 1.0)))
            .await
            .unwrap();

        assert_eq!(catalog.len(), 1);
    }

    #[tokio::test]
    async fn test_custom_order_is_passed_to_query() {
        let mut documents = MockDocumentStore::new();
        documents
            .expect_query()
            .withf(|_, order| *order == OrderBy::ascending(ProductField::Name))
            .times(1)
            .returning(|_, _| Ok(Box::pin(stream::empty())));

        let mut catalog = catalog(documents, MockBlobStore::new())
            .with_order(OrderBy::ascending(ProductField::Name));

        assert_eq!(catalog.refresh(&Owner::new("u1")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_edit_session_for_unlisted_product_is_not_found() {
        let catalog = catalog(MockDocumentStore::new(), MockBlobStore::new());
        let result = catalog.edit_session(&Owner::new("u1"), Some("missing"));

        assert!(matches!(result, Err(ProductError::NotFound(_))));
    }
}
