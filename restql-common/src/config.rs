//! Configuration types for the restql query compiler

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identifier::is_valid_identifier;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RestqlConfig {
    /// Pagination and result-size limits
    pub query: QueryLimitsConfig,
    /// Schema exposure settings
    pub schema: SchemaConfig,
    /// Logging settings for the binary
    pub logging: LoggingConfig,
}

impl RestqlConfig {
    /// Check that the configuration is usable.
    ///
    /// # Errors
    /// Returns `ConfigError` if the schema name is empty or is not a plain identifier.
    pub fn validate(&self) -> Result<()> {
        let schema = &self.schema.schema;
        if schema.is_empty() {
            return Err(Error::ConfigError("schema name must not be empty".to_string()));
        }
        if !is_valid_identifier(schema) {
            return Err(Error::ConfigError(format!(
                "schema name '{schema}' is not a valid identifier"
            )));
        }
        Ok(())
    }
}

/// Page-size and result quota limits.
///
/// A negative value means the limit is not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryLimitsConfig {
    /// Hard cap on rows returned by a single request
    pub max_page_size: i64,
    /// Cap on `offset + limit` across paged requests
    pub max_total_results: i64,
    /// Limit applied when the request has none
    pub default_page_size: i64,
}

impl QueryLimitsConfig {
    /// Limits with every tier disabled
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_page_size: -1,
            max_total_results: -1,
            default_page_size: -1,
        }
    }
}

impl Default for QueryLimitsConfig {
    fn default() -> Self {
        Self {
            max_page_size: 1000,
            max_total_results: -1,
            default_page_size: -1,
        }
    }
}

/// Schema exposure configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Database schema to expose (default: "public")
    pub schema: String,
    /// JSON file with table metadata used to prime the schema cache
    pub tables_file: Option<PathBuf>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            tables_file: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Emit JSON-formatted log lines
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
