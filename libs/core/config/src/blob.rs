use crate::{env_or_default, ConfigError, FromEnv};

/// Blob store settings for product images
#[derive(Clone, Debug)]
pub struct BlobStoreConfig {
    /// Backend location: `memory://`, `file:///dir` or `s3://bucket?region=...`
    pub store_url: String,
    /// Prefix of every public URL the store hands out
    pub public_base_url: String,
}

impl BlobStoreConfig {
    pub fn new(store_url: impl Into<String>, public_base_url: impl Into<String>) -> Self {
        Self {
            store_url: store_url.into(),
            public_base_url: public_base_url.into(),
        }
    }
}

impl FromEnv for BlobStoreConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            store_url: env_or_default("BLOB_STORE_URL", "file:///tmp/catalog-images"),
            public_base_url: env_or_default(
                "BLOB_PUBLIC_BASE_URL",
                "http://localhost:9199/v0/b/catalog",
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_config_defaults() {
        temp_env::with_vars_unset(["BLOB_STORE_URL", "BLOB_PUBLIC_BASE_URL"], || {
            let config = BlobStoreConfig::from_env().unwrap();
            assert_eq!(config.store_url, "file:///tmp/catalog-images");
            assert_eq!(config.public_base_url, "http://localhost:9199/v0/b/catalog");
        });
    }

    #[test]
    fn test_blob_config_from_env() {
        temp_env::with_vars(
            [
                ("BLOB_STORE_URL", Some("memory://")),
                ("BLOB_PUBLIC_BASE_URL", Some("https://cdn.example.com/catalog")),
            ],
            || {
                let config = BlobStoreConfig::from_env().unwrap();
                assert_eq!(config.store_url, "memory://");
                assert_eq!(config.public_base_url, "https://cdn.example.com/catalog");
            },
        );
    }
}
