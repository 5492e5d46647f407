//! Client configuration
//!
//! Loaded from TOML, e.g.
//!
//! ```toml
//! url = "https://itop.example.com/webservices/rest.php"
//! version = "1.3"
//! auth_user = "admin"
//! auth_pwd = "secret"
//! workers = 10
//! data_model = "datamodel-production.xml"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::datamodel::{IndexOptions, DEFAULT_ROOT_SCHEMA};
use crate::error::{ItopError, ItopResult};

fn default_version() -> String {
    "1.3".to_string()
}

fn default_workers() -> usize {
    10
}

fn default_root_schema() -> String {
    DEFAULT_ROOT_SCHEMA.to_string()
}

/// Connection and batch settings for `ItopClient`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// REST endpoint (`.../webservices/rest.php`)
    pub url: String,
    /// REST API version
    #[serde(default = "default_version")]
    pub version: String,
    pub auth_user: String,
    pub auth_pwd: String,
    /// Maximum number of requests in flight for batch operations
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Optional data-model document enabling relationship resolution
    #[serde(default)]
    pub data_model: Option<PathBuf>,
    /// Ancestor excluded from relationship inheritance
    #[serde(default = "default_root_schema")]
    pub root_schema: String,
}

impl ClientConfig {
    pub fn new(url: &str, auth_user: &str, auth_pwd: &str) -> Self {
        Self {
            url: url.to_string(),
            version: default_version(),
            auth_user: auth_user.to_string(),
            auth_pwd: auth_pwd.to_string(),
            workers: default_workers(),
            data_model: None,
            root_schema: default_root_schema(),
        }
    }

    /// Parses and validates a TOML configuration
    pub fn from_toml_str(content: &str) -> ItopResult<Self> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ItopResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> ItopResult<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ItopError::Config(format!(
                "Connection adapters (http:// or https://) is invalid: {}",
                self.url
            )));
        }
        if self.version.is_empty() {
            return Err(ItopError::Config("API version cannot be empty".to_string()));
        }
        if self.workers == 0 {
            return Err(ItopError::Config("workers must be at least 1".to_string()));
        }
        if self.root_schema.is_empty() {
            return Err(ItopError::Config("root_schema cannot be empty".to_string()));
        }
        Ok(())
    }

    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            root_schema: self.root_schema.clone(),
        }
    }
}
