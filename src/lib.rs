//! restql: PostgREST-style query DSL compiler
//!
//! Compiles REST query strings into parameterized Postgres statements for a
//! data API. The HTTP layer and query execution live elsewhere; this crate
//! only produces SQL text and its bind values.
//!
//! # Features
//!
//! - **Filter DSL** - `col=op.value`, nested `and`/`or` groups, `not`
//! - **JSONB paths** - `data->stats->>count` with numeric casting
//! - **Spatial and vector operators** - PostGIS and pgvector predicates and ordering
//! - **Quotas** - page-size caps and total-results limits
//! - **Keyset cursors** - opaque resume tokens

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub use restql_common as common;
pub use restql_query as query;

use serde::Serialize;
use tracing::info;

use restql_common::config::RestqlConfig;
use restql_common::error::Result;
use restql_query::{CompiledQuery, ParseOptions, QueryParser, SchemaCache, SqlAssembler};

/// Statements compiled for one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledRequest {
    pub sql: String,
    pub params: Vec<serde_json::Value>,
    pub count_sql: Option<CompiledQuery>,
}

/// Parser, limits and table metadata bundled for request handlers
#[derive(Debug, Clone)]
pub struct Restql {
    config: RestqlConfig,
    parser: QueryParser,
    schema: SchemaCache,
}

impl Restql {
    /// Build a compiler from configuration, loading table metadata when a
    /// tables file is configured
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the tables file
    /// cannot be read.
    pub fn new(config: RestqlConfig) -> Result<Self> {
        config.validate()?;

        let schema = match &config.schema.tables_file {
            Some(path) => SchemaCache::from_json_file(&config.schema.schema, path)?,
            None => SchemaCache::new(&config.schema.schema),
        };
        info!(
            schema = %config.schema.schema,
            tables = schema.len(),
            "restql compiler ready"
        );

        Ok(Self {
            parser: QueryParser::new(config.query),
            config,
            schema,
        })
    }

    #[must_use]
    pub fn config(&self) -> &RestqlConfig {
        &self.config
    }

    #[must_use]
    pub fn parser(&self) -> &QueryParser {
        &self.parser
    }

    #[must_use]
    pub fn schema(&self) -> &SchemaCache {
        &self.schema
    }

    /// Parse `query_string` and assemble the data and count statements for `table`.
    ///
    /// Tables known to the schema cache get GeoJSON conversion and column
    /// existence checks; unknown tables are compiled without metadata.
    ///
    /// # Errors
    /// Returns the parse or assembly error for a malformed request.
    pub fn compile(
        &self,
        table: &str,
        query_string: &str,
        options: ParseOptions,
    ) -> Result<CompiledRequest> {
        let params = self.parser.parse_query_string(query_string, options)?;
        let info = self.schema.get_table(table);

        let assembler = match &info {
            Some(info) => SqlAssembler::for_table(info).validate_columns(true),
            None => SqlAssembler::new(table).with_schema(self.schema.schema()),
        };

        let query = assembler.select(&params)?;
        let count_sql = assembler.count(&params)?;
        Ok(CompiledRequest {
            sql: query.sql,
            params: query.params,
            count_sql,
        })
    }
}
