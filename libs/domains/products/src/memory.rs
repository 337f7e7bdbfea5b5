//! In-memory [`DocumentStore`] for tests and offline demos

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{ProductError, ProductResult};
use crate::models::{
    CollectionPath, DocumentPath, OrderBy, Product, ProductField, ProductPayload, SortDirection,
};
use crate::repository::{DocumentStore, ProductStream};

/// Documents keyed by collection path, kept in insertion order
#[derive(Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<CollectionPath, Vec<(String, ProductPayload)>>>,
    unavailable: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with `StoreUnavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    /// Number of documents in `path`
    pub async fn len(&self, path: &CollectionPath) -> usize {
        self.collections
            .read()
            .await
            .get(path)
            .map_or(0, |documents| documents.len())
    }

    /// Count of successful insert and replace calls
    pub fn write_count(&self) -> usize {
        self.writes.load(AtomicOrdering::SeqCst)
    }

    fn ensure_available(&self) -> ProductResult<()> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            return Err(ProductError::StoreUnavailable(
                "in-memory store switched off".to_string(),
            ));
        }
        Ok(())
    }

    fn compare(order: OrderBy, a: &ProductPayload, b: &ProductPayload) -> Ordering {
        let ordering = match order.field {
            ProductField::Name => a.name.cmp(&b.name),
            ProductField::Price => a.price.total_cmp(&b.price),
            ProductField::SoldUnits => a.sold_units.total_cmp(&b.sold_units),
        };
        match order.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn query(&self, path: &CollectionPath, order: OrderBy) -> ProductResult<ProductStream> {
        self.ensure_available()?;

        let mut documents = self
            .collections
            .read()
            .await
            .get(path)
            .cloned()
            .unwrap_or_default();
        documents.sort_by(|(_, a), (_, b)| Self::compare(order, a, b));

        let products = documents
            .into_iter()
            .map(|(id, payload)| Ok(Product::from_payload(id, payload)));
        Ok(stream::iter(products).boxed())
    }

    async fn insert(&self, path: &CollectionPath, data: ProductPayload) -> ProductResult<String> {
        self.ensure_available()?;

        let id = Uuid::now_v7().simple().to_string();
        self.collections
            .write()
            .await
            .entry(path.clone())
            .or_default()
            .push((id.clone(), data));
        self.writes.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(id)
    }

    async fn replace(&self, path: &DocumentPath, data: ProductPayload) -> ProductResult<()> {
        self.ensure_available()?;

        let mut collections = self.collections.write().await;
        let document = collections
            .get_mut(path.collection())
            .and_then(|documents| documents.iter_mut().find(|(id, _)| id == path.id()))
            .ok_or_else(|| ProductError::NotFound(path.to_string()))?;
        document.1 = data;
        self.writes.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }

    async fn remove(&self, path: &DocumentPath) -> ProductResult<()> {
        self.ensure_available()?;

        if let Some(documents) = self.collections.write().await.get_mut(path.collection()) {
            documents.retain(|(id, _)| id != path.id());
        }
        Ok(())
    }
}
