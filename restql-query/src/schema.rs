//! Cached table metadata used for schema-aware assembly

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use restql_common::error::{Error, Result};
use restql_common::types::{ColumnInfo, TableInfo};

use crate::identifier::require_identifier;
use crate::sql::conflict_target;

/// Schema cache for table metadata supplied by an introspection layer
#[derive(Debug, Clone)]
pub struct SchemaCache {
    tables: Arc<RwLock<HashMap<String, TableInfo>>>,
    schema: String,
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new("public")
    }
}

impl SchemaCache {
    /// Create a new schema cache
    pub fn new(schema: &str) -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            schema: schema.to_string(),
        }
    }

    /// Load table metadata from a JSON array of tables
    pub fn from_json_file(schema: &str, path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let cache = Self::from_json_str(schema, &text)?;
        info!(path = %path.display(), tables = cache.len(), "loaded table metadata");
        Ok(cache)
    }

    pub fn from_json_str(schema: &str, json: &str) -> Result<Self> {
        let tables: Vec<TableInfo> = serde_json::from_str(json)?;
        let cache = Self::new(schema);
        for table in tables {
            cache.register(table)?;
        }
        Ok(cache)
    }

    /// Add or replace a table. Table and column names must be safe identifiers.
    pub fn register(&self, table: TableInfo) -> Result<()> {
        require_identifier(&table.schema)?;
        require_identifier(&table.name)?;
        for column in &table.columns {
            require_identifier(&column.name)?;
        }
        debug!(table = %table.name, columns = table.columns.len(), "registering table");
        self.tables.write().insert(table.name.clone(), table);
        Ok(())
    }

    /// Get table info by name
    pub fn get_table(&self, name: &str) -> Option<TableInfo> {
        self.tables.read().get(name).cloned()
    }

    /// Get table info, failing with `TableNotFound`
    pub fn require_table(&self, name: &str) -> Result<TableInfo> {
        self.get_table(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    /// All tables, sorted by name
    pub fn get_all_tables(&self) -> Vec<TableInfo> {
        let mut tables: Vec<_> = self.tables.read().values().cloned().collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        tables
    }

    /// Check if table exists
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.read().contains_key(name)
    }

    /// Get table columns
    pub fn get_columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        self.require_table(table).map(|t| t.columns)
    }

    /// Check if column exists
    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .read()
            .get(table)
            .is_some_and(|t| t.has_column(column))
    }

    /// Quoted primary-key list for upserts on `table`
    pub fn conflict_target(&self, table: &str) -> Result<Option<String>> {
        conflict_target(&self.require_table(table)?)
    }

    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }

    /// Get schema name
    pub fn schema(&self) -> &str {
        &self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLES: &str = r#"[
        {
            "name": "users",
            "columns": [
                {"name": "id", "data_type": "uuid", "is_nullable": false, "has_default": true},
                {"name": "email", "data_type": "text"}
            ],
            "primary_key": ["id"]
        },
        {
            "name": "places",
            "columns": [
                {"name": "id", "data_type": "bigint"},
                {"name": "location", "data_type": "geography(Point,4326)"}
            ]
        }
    ]"#;

    #[test]
    fn test_load_from_json() {
        let cache = SchemaCache::from_json_str("public", TABLES).unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.has_table("users"));
        assert!(!cache.has_table("nonexistent"));
        assert_eq!(cache.get_table("users").unwrap().schema, "public");
        assert!(cache.get_table("places").unwrap().has_spatial_columns());
    }

    #[test]
    fn test_get_columns() {
        let cache = SchemaCache::from_json_str("public", TABLES).unwrap();
        let columns = cache.get_columns("users").unwrap();
        assert!(columns.iter().any(|c| c.name == "email"));
        assert!(cache.has_column("users", "email"));
        assert!(!cache.has_column("users", "password"));
        assert!(matches!(
            cache.get_columns("missing"),
            Err(Error::TableNotFound(_))
        ));
    }

    #[test]
    fn test_conflict_target() {
        let cache = SchemaCache::from_json_str("public", TABLES).unwrap();
        assert_eq!(cache.conflict_target("users").unwrap().as_deref(), Some("\"id\""));
        assert!(cache.conflict_target("places").unwrap().is_none());
    }

    #[test]
    fn test_register_rejects_unsafe_names() {
        let cache = SchemaCache::default();
        let table = TableInfo {
            schema: "public".to_string(),
            name: "bad name".to_string(),
            columns: vec![],
            primary_key: None,
        };
        assert!(cache.register(table).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_tables_sorted() {
        let cache = SchemaCache::from_json_str("public", TABLES).unwrap();
        let names: Vec<_> = cache.get_all_tables().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["places", "users"]);
    }
}
