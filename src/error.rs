use std::io;
use thiserror::Error;

use crate::client::envelope::ReturnCode;

/// Unified error type for the iTop client.
///
/// Data-model failures (`Parse`, `SchemaNotFound`, `MalformedField`) and
/// resolution failures (`Lookup`) are never retried inside the crate; they
/// propagate to the caller unchanged.
#[derive(Debug, Error)]
pub enum ItopError {
    /// The data-model document could not be parsed structurally
    #[error("Parse error: {0}")]
    Parse(String),

    /// A schema name has no declaration in the data model
    #[error("Schema not found: {0}")]
    SchemaNotFound(String),

    /// A relationship field lacks a sub-element it needs
    #[error("Malformed field {schema}.{field}: {reason}")]
    MalformedField {
        schema: String,
        field: String,
        reason: String,
    },

    /// A related record referenced by an external field does not exist
    #[error("Lookup error: no {schema} with {target_field} = {value} (from field '{field}')")]
    Lookup {
        field: String,
        value: String,
        schema: String,
        target_field: String,
    },

    /// The remote service answered with a non-zero return code
    #[error("{message}\n{code}.")]
    Api { code: ReturnCode, message: String },

    /// Errors raised by the HTTP layer
    #[error("HTTP error: {0}")]
    Http(String),

    /// Errors related to serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Errors related to IO operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A query or object argument has the wrong shape
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl ItopError {
    /// Create a malformed field error
    pub fn malformed<S: Into<String>>(schema: &str, field: &str, reason: S) -> Self {
        Self::MalformedField {
            schema: schema.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// True when the remote service reported an error whose message contains `needle`
    pub fn api_message_contains(&self, needle: &str) -> bool {
        matches!(self, Self::Api { message, .. } if message.contains(needle))
    }
}

/// Conversion from serde_json::Error to ItopError
impl From<serde_json::Error> for ItopError {
    fn from(error: serde_json::Error) -> Self {
        ItopError::Serialization(error.to_string())
    }
}

/// Conversion from toml::de::Error to ItopError
impl From<toml::de::Error> for ItopError {
    fn from(error: toml::de::Error) -> Self {
        ItopError::Config(error.to_string())
    }
}

/// Conversion from reqwest::Error to ItopError
impl From<reqwest::Error> for ItopError {
    fn from(error: reqwest::Error) -> Self {
        ItopError::Http(error.to_string())
    }
}

/// Result type alias for operations that can result in an ItopError
pub type ItopResult<T> = Result<T, ItopError>;
