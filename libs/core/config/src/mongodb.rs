use crate::{env_optional, env_or_default, env_parse_or, env_required, ConfigError, FromEnv};

/// MongoDB connection settings for the document store
#[derive(Clone, Debug)]
pub struct MongoConfig {
    /// Connection string, e.g. `mongodb://localhost:27017`
    pub uri: String,
    /// Database holding the owner collections
    pub database: String,
    /// Reported to the server in its connection logs
    pub app_name: Option<String>,
    pub connect_timeout_secs: u64,
    pub server_selection_timeout_secs: u64,
}

impl MongoConfig {
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            app_name: None,
            connect_timeout_secs: 10,
            server_selection_timeout_secs: 30,
        }
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }
}

impl FromEnv for MongoConfig {
    /// Requires `MONGO_URI`. `MONGO_DATABASE` defaults to `catalog`.
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            uri: env_required("MONGO_URI")?,
            database: env_or_default("MONGO_DATABASE", "catalog"),
            app_name: env_optional("MONGO_APP_NAME"),
            connect_timeout_secs: env_parse_or("MONGO_CONNECT_TIMEOUT_SECS", 10)?,
            server_selection_timeout_secs: env_parse_or("MONGO_SERVER_SELECTION_TIMEOUT_SECS", 30)?,
        })
    }
}
