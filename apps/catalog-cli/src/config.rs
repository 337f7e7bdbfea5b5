//! Configuration for the catalog CLI

use core_config::blob::BlobStoreConfig;
use core_config::mongodb::MongoConfig;
use core_config::{env_required, ConfigError, Environment, FromEnv};

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub mongodb: MongoConfig,
    pub blob: BlobStoreConfig,
    /// Catalog owner every command acts for
    pub owner_uid: String,
}

impl FromEnv for Config {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            environment: Environment::from_env(),
            mongodb: MongoConfig::from_env()?,
            blob: BlobStoreConfig::from_env()?,
            owner_uid: env_required("CATALOG_OWNER_UID")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_uid_is_required() {
        temp_env::with_vars(
            [
                ("MONGO_URI", Some("mongodb://localhost:27017")),
                ("CATALOG_OWNER_UID", None::<&str>),
            ],
            || {
                let result = Config::from_env();
                assert!(matches!(
                    result,
                    Err(ConfigError::MissingEnvVar(key)) if key == "CATALOG_OWNER_UID"
                ));
            },
        );
    }

    #[test]
    fn test_from_env_reads_all_sections() {
        temp_env::with_vars(
            [
                ("APP_ENV", Some("production")),
                ("MONGO_URI", Some("mongodb://db:27017")),
                ("MONGO_DATABASE", Some("shop")),
                ("BLOB_STORE_URL", Some("memory://")),
                ("CATALOG_OWNER_UID", Some("u1")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert!(config.environment.is_production());
                assert_eq!(config.mongodb.database, "shop");
                assert_eq!(config.blob.store_url, "memory://");
                assert_eq!(config.owner_uid, "u1");
            },
        );
    }
}
