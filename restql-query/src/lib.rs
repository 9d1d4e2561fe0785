//! restql Query Compiler (PostgREST-compatible)
//!
//! Turns HTTP query strings into parameterized Postgres queries, supporting:
//! - Filtering (eq, neq, gt, gte, lt, lte, like, ilike, in, is, etc.)
//! - Nested `and=(...)` / `or=(...)` groups
//! - JSONB path traversal (`data->stats->>count`)
//! - Range, full-text, spatial (PostGIS) and vector (pgvector) operators
//! - Aggregations, grouping and ordering
//! - Page-size and total-results quotas, keyset cursors

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cursor;
pub mod fields;
pub mod identifier;
pub mod jsonb;
pub mod logic;
pub mod operator;
pub mod pagination;
pub mod params;
pub mod parser;
pub mod schema;
pub mod sql;
pub mod value;

pub use cursor::{decode_cursor, encode_cursor, next_cursor, Cursor};
pub use identifier::{is_valid_identifier, quote_identifier, validate_ddl_identifier};
pub use jsonb::parse_jsonb_path;
pub use operator::{FilterOperator, VectorOp};
pub use params::{
    AggregateFunction, Aggregation, CountMode, Filter, FilterValue, NullsOrder, OrderBy,
    ParseOptions, QueryParams,
};
pub use parser::QueryParser;
pub use schema::SchemaCache;
pub use sql::{CompiledQuery, SqlAssembler, SqlParams};
