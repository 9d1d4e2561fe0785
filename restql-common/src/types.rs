//! Common types for the restql query compiler

use serde::{Deserialize, Serialize};

use crate::error::Error;

// ============================================================================
// Database Types
// ============================================================================

/// Table metadata from schema introspection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub primary_key: Option<Vec<String>>,
}

fn default_schema() -> String {
    "public".to_string()
}

impl TableInfo {
    /// Look up a column by name
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check if column exists
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Whether any column holds PostGIS geometry or geography values
    #[must_use]
    pub fn has_spatial_columns(&self) -> bool {
        self.columns.iter().any(ColumnInfo::is_spatial)
    }
}

/// Column metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    #[serde(default = "default_true")]
    pub is_nullable: bool,
    #[serde(default)]
    pub has_default: bool,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            has_default: false,
            description: None,
        }
    }

    /// Whether values must be converted to GeoJSON on the way out
    #[must_use]
    pub fn is_spatial(&self) -> bool {
        let ty = self.data_type.to_ascii_lowercase();
        ty.starts_with("geometry") || ty.starts_with("geography")
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// Standard API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<&Error> for ApiError {
    fn from(err: &Error) -> Self {
        let api = Self::new(err.error_code(), err.to_string());
        match err {
            Error::UnbalancedParentheses(_) => {
                api.with_hint("Every '(' in and=/or= expressions needs a matching ')'")
            }
            Error::InvalidIdentifier(_) => api.with_hint(
                "Identifiers must match [A-Za-z_][A-Za-z0-9_]* and be at most 63 characters",
            ),
            _ => api,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spatial_columns() {
        let table = TableInfo {
            schema: "public".to_string(),
            name: "places".to_string(),
            columns: vec![
                ColumnInfo::new("id", "bigint"),
                ColumnInfo::new("location", "geometry(Point,4326)"),
            ],
            primary_key: Some(vec!["id".to_string()]),
        };
        assert!(table.has_spatial_columns());
        assert!(table.column("location").unwrap().is_spatial());
        assert!(!table.column("id").unwrap().is_spatial());
        assert!(!table.has_column("missing"));
    }

    #[test]
    fn test_table_info_from_json_defaults() {
        let table: TableInfo = serde_json::from_str(
            r#"{"name": "users", "columns": [{"name": "id", "data_type": "uuid"}]}"#,
        )
        .unwrap();
        assert_eq!(table.schema, "public");
        assert!(table.columns[0].is_nullable);
        assert!(table.primary_key.is_none());
    }

    #[test]
    fn test_api_error() {
        let error = ApiError::new("invalid_request", "Missing required field")
            .with_hint("Include 'select' parameter");
        assert_eq!(error.code, "invalid_request");
        assert!(error.hint.is_some());
    }

    #[test]
    fn test_api_error_from_error() {
        let api = ApiError::from(&Error::UnbalancedParentheses("or".to_string()));
        assert_eq!(api.code, "unbalanced_parentheses");
        assert!(api.message.contains("or"));
        assert!(api.hint.is_some());
    }

    #[test]
    fn test_api_error_details_serialized() {
        let api = ApiError::from(&Error::TableNotFound("orders".to_string()))
            .with_details(serde_json::json!({ "table": "orders", "query": "id=eq.1" }));
        let body = serde_json::to_value(&api).unwrap();
        assert_eq!(body["details"]["table"], "orders");
        assert!(body.get("hint").is_none());

        let bare = serde_json::to_value(ApiError::new("internal_error", "boom")).unwrap();
        assert!(bare.get("details").is_none());
    }
}
