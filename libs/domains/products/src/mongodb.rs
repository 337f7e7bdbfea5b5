//! MongoDB implementation of [`DocumentStore`]
//!
//! A collection path such as `owners/u1/products` maps to the MongoDB
//! collection named after its last segment (`products`). The remaining
//! segments are stored in a `_parent` field so each owner only ever sees
//! their own documents. Identifiers are MongoDB `ObjectId`s, rendered as hex.

use std::time::Duration;

use async_trait::async_trait;
use core_config::mongodb::MongoConfig;
use futures_util::{StreamExt, TryStreamExt};
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, Document},
    options::{ClientOptions, FindOptions, IndexOptions},
    Client, Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{ProductError, ProductResult};
use crate::models::{CollectionPath, DocumentPath, OrderBy, Product, ProductPayload, SortDirection};
use crate::repository::{DocumentStore, ProductStream};

const PARENT_FIELD: &str = "_parent";

/// Shape written to MongoDB
#[derive(Debug, Serialize)]
struct ProductRecord {
    #[serde(rename = "_parent")]
    parent: String,
    #[serde(flatten)]
    body: ProductPayload,
}

/// Shape read back from MongoDB
#[derive(Debug, Deserialize)]
struct StoredProduct {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[serde(flatten)]
    body: ProductPayload,
}

impl From<StoredProduct> for Product {
    fn from(stored: StoredProduct) -> Self {
        Product::from_payload(stored.id.to_hex(), stored.body)
    }
}

/// MongoDB-backed document store
#[derive(Clone)]
pub struct MongoDocumentStore {
    db: Database,
}

impl MongoDocumentStore {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    /// Connect using `config` and verify the server answers a ping
    #[instrument(skip(config), fields(database = %config.database))]
    pub async fn connect(config: &MongoConfig) -> ProductResult<Self> {
        let mut options = ClientOptions::parse(&config.uri).await?;
        options.connect_timeout = Some(Duration::from_secs(config.connect_timeout_secs));
        options.server_selection_timeout =
            Some(Duration::from_secs(config.server_selection_timeout_secs));
        if let Some(ref app_name) = config.app_name {
            options.app_name = Some(app_name.clone());
        }

        let client = Client::with_options(options)?;
        let db = client.database(&config.database);
        db.run_command(doc! { "ping": 1 }).await?;

        tracing::info!("Connected to MongoDB");
        Ok(Self { db })
    }

    /// Create the index backing the per-owner listing query
    pub async fn init_indexes(&self, collection: &str) -> ProductResult<()> {
        let index = IndexModel::builder()
            .keys(doc! { PARENT_FIELD: 1, "soldUnits": -1 })
            .options(
                IndexOptions::builder()
                    .name("idx_parent_sold_units".to_string())
                    .build(),
            )
            .build();

        self.db
            .collection::<Document>(collection)
            .create_index(index)
            .await?;
        tracing::info!(collection, "Product indexes created successfully");
        Ok(())
    }

    fn records(&self, path: &CollectionPath) -> Collection<ProductRecord> {
        self.db.collection::<ProductRecord>(path.name())
    }

    fn stored(&self, path: &CollectionPath) -> Collection<StoredProduct> {
        self.db.collection::<StoredProduct>(path.name())
    }

    /// Filter addressing one document; `None` when the id cannot be an ObjectId
    fn document_filter(path: &DocumentPath) -> Option<Document> {
        let id = ObjectId::parse_str(path.id()).ok()?;
        Some(doc! { "_id": id, PARENT_FIELD: path.collection().parent() })
    }

    fn sort_document(order: OrderBy) -> Document {
        let direction = match order.direction {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        };
        doc! { order.field.to_string(): direction }
    }
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    #[instrument(skip(self), fields(path = %path))]
    async fn query(&self, path: &CollectionPath, order: OrderBy) -> ProductResult<ProductStream> {
        let options = FindOptions::builder()
            .sort(Self::sort_document(order))
            .build();

        let cursor = self
            .stored(path)
            .find(doc! { PARENT_FIELD: path.parent() })
            .with_options(options)
            .await?;

        Ok(cursor.map_ok(Product::from).map_err(ProductError::from).boxed())
    }

    #[instrument(skip(self, data), fields(path = %path))]
    async fn insert(&self, path: &CollectionPath, data: ProductPayload) -> ProductResult<String> {
        let record = ProductRecord {
            parent: path.parent().to_string(),
            body: data,
        };
        let result = self.records(path).insert_one(&record).await?;

        let id = match result.inserted_id {
            Bson::ObjectId(id) => id.to_hex(),
            other => {
                return Err(ProductError::StoreUnavailable(format!(
                    "unexpected identifier type returned by insert: {}",
                    other
                )))
            }
        };

        tracing::info!(product_id = %id, "Product document created");
        Ok(id)
    }

    #[instrument(skip(self, data), fields(path = %path))]
    async fn replace(&self, path: &DocumentPath, data: ProductPayload) -> ProductResult<()> {
        let filter =
            Self::document_filter(path).ok_or_else(|| ProductError::NotFound(path.to_string()))?;
        let record = ProductRecord {
            parent: path.collection().parent().to_string(),
            body: data,
        };

        let result = self
            .records(path.collection())
            .replace_one(filter, &record)
            .await?;
        if result.matched_count == 0 {
            return Err(ProductError::NotFound(path.to_string()));
        }

        tracing::info!("Product document replaced");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn remove(&self, path: &DocumentPath) -> ProductResult<()> {
        let Some(filter) = Self::document_filter(path) else {
            tracing::debug!("Identifier is not an ObjectId, nothing to remove");
            return Ok(());
        };

        let result = self.records(path.collection()).delete_one(filter).await?;
        if result.deleted_count == 0 {
            tracing::debug!("Product document already absent");
        } else {
            tracing::info!("Product document removed");
        }
        Ok(())
    }
}
