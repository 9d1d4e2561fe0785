//! Error types for the restql query compiler

use thiserror::Error;

/// Query compilation error types
#[derive(Error, Debug)]
pub enum Error {
    // Query String Errors
    #[error("Invalid query parameter: {0}")]
    InvalidQueryParam(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Unbalanced parentheses in {0}")]
    UnbalancedParentheses(String),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    // Schema Errors
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    // General Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for query compilation
pub type Result<T> = std::result::Result<T, Error>;

/// HTTP status code for each error type
impl Error {
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Self::InvalidQueryParam(_)
            | Self::InvalidFilter(_)
            | Self::InvalidIdentifier(_)
            | Self::UnbalancedParentheses(_)
            | Self::InvalidCursor(_) => 400,

            // 404 Not Found
            Self::TableNotFound(_) | Self::ColumnNotFound(_) => 404,

            // 500 Internal Server Error
            Self::ConfigError(_)
            | Self::InternalError(_)
            | Self::IoError(_)
            | Self::JsonError(_) => 500,
        }
    }

    /// Error code for API responses
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidQueryParam(_) => "invalid_param",
            Self::InvalidFilter(_) => "invalid_filter",
            Self::InvalidIdentifier(_) => "invalid_identifier",
            Self::UnbalancedParentheses(_) => "unbalanced_parentheses",
            Self::InvalidCursor(_) => "invalid_cursor",
            Self::TableNotFound(_) => "table_not_found",
            Self::ColumnNotFound(_) => "column_not_found",
            Self::ConfigError(_) => "config_error",
            Self::InternalError(_) => "internal_error",
            Self::IoError(_) => "io_error",
            Self::JsonError(_) => "json_error",
        }
    }

    /// Whether the error was caused by the client's request rather than the server
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}
