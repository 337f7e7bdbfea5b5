//! [`BlobStore`] backed by the `object_store` crate
//!
//! Supports the in-memory backend (tests), the local filesystem and S3.
//! Public URLs follow the Firebase-style layout
//! `{public_base_url}/o/{percent-encoded path}?alt=media`, which is what
//! [`BlobStore::resolve_path`] reverses.

use std::sync::Arc;

use async_trait::async_trait;
use object_store::{path::Path, ObjectStore, PutPayload};
use tracing::instrument;

use crate::error::{ProductError, ProductResult};
use crate::models::{BlobPath, DataUrl};
use crate::repository::BlobStore;

const OBJECT_SEGMENT: &str = "/o/";
const MEDIA_QUERY: &str = "alt=media";

pub struct ObjectStoreBlobStore {
    inner: Arc<dyn ObjectStore>,
    public_base_url: String,
}

impl ObjectStoreBlobStore {
    pub fn new(inner: Arc<dyn ObjectStore>, public_base_url: impl Into<String>) -> Self {
        Self {
            inner,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// In-memory store for tests and throwaway sessions
    pub fn memory(public_base_url: impl Into<String>) -> Self {
        Self::new(
            Arc::new(object_store::memory::InMemory::new()),
            public_base_url,
        )
    }

    /// Build a store from `memory://`, `file:///dir` or `s3://bucket?region=...`
    pub fn from_url(store_url: &str, public_base_url: impl Into<String>) -> ProductResult<Self> {
        let url = url::Url::parse(store_url).map_err(|e| {
            ProductError::UploadFailed(format!("invalid blob store url '{}': {}", store_url, e))
        })?;

        let inner: Arc<dyn ObjectStore> = match url.scheme() {
            "memory" => Arc::new(object_store::memory::InMemory::new()),
            "file" => {
                let root = url.path();
                std::fs::create_dir_all(root).map_err(|e| {
                    ProductError::UploadFailed(format!(
                        "failed to create blob directory {}: {}",
                        root, e
                    ))
                })?;
                Arc::new(
                    object_store::local::LocalFileSystem::new_with_prefix(root).map_err(|e| {
                        ProductError::UploadFailed(format!(
                            "failed to open blob directory {}: {}",
                            root, e
                        ))
                    })?,
                )
            }
            "s3" => {
                let bucket = url.host_str().ok_or_else(|| {
                    ProductError::UploadFailed("s3 blob store url must name a bucket".to_string())
                })?;
                let mut builder =
                    object_store::aws::AmazonS3Builder::from_env().with_bucket_name(bucket);
                if let Some((_, region)) = url.query_pairs().find(|(key, _)| key == "region") {
                    builder = builder.with_region(region.into_owned());
                }
                Arc::new(builder.build().map_err(|e| {
                    ProductError::UploadFailed(format!("failed to create S3 client: {}", e))
                })?)
            }
            scheme => {
                return Err(ProductError::UploadFailed(format!(
                    "unsupported blob store scheme: {}",
                    scheme
                )))
            }
        };

        Ok(Self::new(inner, public_base_url))
    }

    /// Public URL handed out for `path`
    pub fn public_url(&self, path: &BlobPath) -> String {
        format!(
            "{}{}{}?{}",
            self.public_base_url,
            OBJECT_SEGMENT,
            urlencoding::encode(path.as_str()),
            MEDIA_QUERY
        )
    }

    /// Whether a blob currently exists at `path`
    pub async fn exists(&self, path: &BlobPath) -> ProductResult<bool> {
        match self.inner.head(&Path::from(path.as_str())).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(ProductError::UploadFailed(format!(
                "failed to check blob {}: {}",
                path, e
            ))),
        }
    }
}

#[async_trait]
impl BlobStore for ObjectStoreBlobStore {
    fn resolve_path(&self, public_url: &str) -> ProductResult<BlobPath> {
        let invalid = || ProductError::InvalidReference(public_url.to_string());

        let encoded = public_url
            .strip_prefix(self.public_base_url.as_str())
            .and_then(|rest| rest.strip_prefix(OBJECT_SEGMENT))
            .ok_or_else(invalid)?;
        let encoded = encoded.split_once('?').map_or(encoded, |(path, _)| path);

        let decoded = urlencoding::decode(encoded).map_err(|_| invalid())?;
        if decoded.is_empty() {
            return Err(invalid());
        }
        Ok(BlobPath::new(decoded.into_owned()))
    }

    #[instrument(skip(self, payload), fields(path = %path, bytes = payload.bytes.len()))]
    async fn upload(&self, path: &BlobPath, payload: &DataUrl) -> ProductResult<String> {
        self.inner
            .put(
                &Path::from(path.as_str()),
                PutPayload::from_bytes(payload.bytes.clone()),
            )
            .await
            .map_err(|e| ProductError::UploadFailed(format!("failed to store {}: {}", path, e)))?;

        tracing::info!(content_type = %payload.content_type, "Image uploaded");
        Ok(self.public_url(path))
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn remove(&self, path: &BlobPath) -> ProductResult<()> {
        match self.inner.delete(&Path::from(path.as_str())).await {
            Ok(()) => {
                tracing::info!("Image removed");
                Ok(())
            }
            Err(object_store::Error::NotFound { .. }) => {
                tracing::debug!("Image already absent");
                Ok(())
            }
            Err(e) => Err(ProductError::UploadFailed(format!(
                "failed to delete {}: {}",
                path, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    const BASE: &str = "https://storage.example.com/v0/b/catalog";

    fn png() -> DataUrl {
        DataUrl {
            content_type: "image/png".into(),
            bytes: Bytes::from_static(b"\x89PNG"),
        }
    }

    #[test]
    fn test_public_url_round_trips_through_resolve() {
        let store = ObjectStoreBlobStore::memory(BASE);
        let path = BlobPath::new("u1/1700000000000");
        let url = store.public_url(&path);

        assert_eq!(url, format!("{}/o/u1%2F1700000000000?alt=media", BASE));
        assert_eq!(store.resolve_path(&url).unwrap(), path);
    }

    #[test]
    fn test_resolve_ignores_trailing_slash_in_base() {
        let store = ObjectStoreBlobStore::memory(format!("{}/", BASE));
        let url = format!("{}/o/u1%2F42?alt=media&token=abc", BASE);
        assert_eq!(store.resolve_path(&url).unwrap().as_str(), "u1/42");
    }

    #[test]
    fn test_resolve_rejects_foreign_urls() {
        let store = ObjectStoreBlobStore::memory(BASE);
        let empty_path = format!("{}/o/?alt=media", BASE);
        for url in [
            "https://elsewhere.example.com/o/u1%2F1",
            "data:image/png;base64,AAAA",
            "",
            empty_path.as_str(),
        ] {
            assert!(
                matches!(store.resolve_path(url), Err(ProductError::InvalidReference(_))),
                "expected InvalidReference for {:?}",
                url
            );
        }
    }

    #[tokio::test]
    async fn test_upload_overwrites_in_place() {
        let store = ObjectStoreBlobStore::memory(BASE);
        let path = BlobPath::new("u1/1");

        let first = store.upload(&path, &png()).await.unwrap();
        let second = store.upload(&path, &png()).await.unwrap();

        assert_eq!(first, second);
        assert!(store.exists(&path).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = ObjectStoreBlobStore::memory(BASE);
        let path = BlobPath::new("u1/1");
        store.upload(&path, &png()).await.unwrap();

        store.remove(&path).await.unwrap();
        store.remove(&path).await.unwrap();
        assert!(!store.exists(&path).await.unwrap());
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("file://{}", dir.path().display());
        let store = ObjectStoreBlobStore::from_url(&url, BASE).unwrap();
        let path = BlobPath::new("u1/7");

        store.upload(&path, &png()).await.unwrap();
        assert!(store.exists(&path).await.unwrap());
        store.remove(&path).await.unwrap();
        store.remove(&path).await.unwrap();
    }

    #[test]
    fn test_from_url_rejects_unknown_scheme() {
        assert!(matches!(
            ObjectStoreBlobStore::from_url("ftp://host/dir", BASE),
            Err(ProductError::UploadFailed(_))
        ));
    }
}
