//! Products Domain
//!
//! Lifecycle management for a single owner's product catalog: each product is
//! a document in a document store plus an image in a blob store, and the two
//! are kept consistent by ordering writes, not by transactions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐
//! │  Catalog    │   │ EditSession │  ← Listing, profit, reports / draft editing
//! └──────┬──────┘   └──────┬──────┘
//!        │                 │
//! ┌──────▼─────────────────▼──────┐
//! │       ProductLifecycle        │  ← create / update / delete sequencing
//! └──────┬─────────────────┬──────┘
//!        │                 │
//! ┌──────▼──────┐   ┌──────▼──────┐
//! │DocumentStore│   │  BlobStore  │  ← Traits; MongoDB / object_store impls
//! └─────────────┘   └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use core_config::{blob::BlobStoreConfig, mongodb::MongoConfig};
//! use domain_products::{
//!     CatalogController, MongoDocumentStore, ObjectStoreBlobStore, Owner, ProductLifecycle,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mongo = MongoConfig::new("mongodb://localhost:27017", "catalog");
//! let blob = BlobStoreConfig::new("memory://", "http://localhost:9199/v0/b/catalog");
//!
//! let documents = MongoDocumentStore::connect(&mongo).await?;
//! let blobs = ObjectStoreBlobStore::from_url(&blob.store_url, blob.public_base_url.clone())?;
//!
//! let owner = Owner::new("u1");
//! let mut catalog = CatalogController::new(ProductLifecycle::new(documents, blobs));
//! catalog.refresh(&owner).await?;
//! println!("profit: {}", catalog.aggregate_profit());
//! # Ok(())
//! # }
//! ```

pub mod blob;
pub mod catalog;
pub mod editor;
pub mod error;
pub mod form;
pub mod memory;
pub mod models;
pub mod mongodb;
pub mod report;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use blob::ObjectStoreBlobStore;
pub use catalog::CatalogController;
pub use editor::{DraftState, EditOutcome, EditSession, EditorEvent, SessionNotice};
pub use error::{ProductError, ProductResult};
pub use form::ProductForm;
pub use memory::InMemoryDocumentStore;
pub use models::{
    BlobPath, CollectionPath, DataUrl, DocumentPath, OrderBy, Owner, Product, ProductDraft,
    ProductField, ProductPayload, SortDirection,
};
pub use mongodb::MongoDocumentStore;
pub use report::{ReportDocument, ReportLine, ReportPage};
pub use repository::{BlobStore, DocumentStore, ProductStream};
pub use service::{DeleteReport, ProductLifecycle};
