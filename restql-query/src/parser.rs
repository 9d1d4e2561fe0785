//! Query string parsing entry point

use std::collections::HashMap;

use tracing::{debug, trace};

use restql_common::config::QueryLimitsConfig;
use restql_common::error::{Error, Result};

use crate::cursor::decode_cursor;
use crate::fields::{parse_group_by, parse_order, parse_select};
use crate::identifier::is_valid_identifier;
use crate::jsonb::render_column_ref;
use crate::logic::{parse_logic, GroupCounter};
use crate::operator::FilterOperator;
use crate::pagination::resolve_limit;
use crate::params::{CountMode, Filter, Junction, ParseOptions, QueryParams};
use crate::value::coerce_value;

/// Parses request query strings into [`QueryParams`].
///
/// Holds only an immutable limits snapshot, so one parser can be shared by
/// every worker.
#[derive(Debug, Clone)]
pub struct QueryParser {
    limits: QueryLimitsConfig,
}

impl Default for QueryParser {
    fn default() -> Self {
        Self::new(QueryLimitsConfig::default())
    }
}

impl QueryParser {
    #[must_use]
    pub fn new(limits: QueryLimitsConfig) -> Self {
        Self { limits }
    }

    #[must_use]
    pub fn limits(&self) -> &QueryLimitsConfig {
        &self.limits
    }

    /// Parse a raw (percent-encoded) query string
    pub fn parse_query_string(&self, query_string: &str, options: ParseOptions) -> Result<QueryParams> {
        let pairs = url::form_urlencoded::parse(query_string.trim_start_matches('?').as_bytes());
        self.parse_pairs(pairs, options)
    }

    /// Parse a multimap of query parameters.
    ///
    /// Keys are visited in sorted order so filter order never depends on
    /// hash-map iteration; values of one key keep their given order.
    pub fn parse_map(&self, params: &HashMap<String, Vec<String>>, options: ParseOptions) -> Result<QueryParams> {
        let mut keys: Vec<&String> = params.keys().collect();
        keys.sort();
        let pairs = keys
            .into_iter()
            .flat_map(|k| params[k].iter().map(move |v| (k.as_str(), v.as_str())));
        self.parse_pairs(pairs, options)
    }

    /// Parse decoded key/value pairs in request order. Keys may repeat.
    pub fn parse_pairs<I, K, V>(&self, pairs: I, options: ParseOptions) -> Result<QueryParams>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut parsed = QueryParams::default();
        let mut groups = GroupCounter::new();

        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "select" => {
                    if !value.trim().is_empty() {
                        let (columns, aggregations) = parse_select(value)?;
                        parsed.select.extend(columns);
                        parsed.aggregations.extend(aggregations);
                    }
                }
                "order" => parsed.order.extend(parse_order(value)?),
                "group_by" => parsed.group_by.extend(parse_group_by(value)?),
                "limit" => parsed.limit = parse_integer("limit", value)?,
                "offset" => parsed.offset = parse_integer("offset", value)?,
                "cursor" => parsed.cursor = non_empty(value),
                "cursor_column" => {
                    parsed.cursor_column = non_empty(value);
                    if let Some(column) = &parsed.cursor_column {
                        if !is_valid_identifier(column) {
                            return Err(Error::InvalidQueryParam(format!(
                                "cursor_column '{column}' is not a valid identifier"
                            )));
                        }
                    }
                }
                "count" => parsed.count = CountMode::parse(value),
                "truncate" => {
                    parsed.truncate_length = parse_integer("truncate", value)?;
                    if parsed.truncate_length.is_some_and(|n| n < 0) {
                        return Err(Error::InvalidQueryParam(format!(
                            "truncate must be >= 0, got {value}"
                        )));
                    }
                }
                "and" => parsed.filters.extend(parse_logic(Junction::And, value, &mut groups)?),
                "or" => parsed.filters.extend(parse_logic(Junction::Or, value, &mut groups)?),
                _ => match split_filter(key, value) {
                    Some((column, op, raw)) => parsed.filters.push(build_filter(column, op, raw)?),
                    None => debug!(key, "ignoring query parameter that is not a filter"),
                },
            }
        }

        check_cursor(&parsed)?;

        parsed.limit = resolve_limit(
            parsed.limit,
            parsed.offset,
            &self.limits,
            options.bypass_max_total_results,
        );

        trace!(
            filters = parsed.filters.len(),
            order = parsed.order.len(),
            limit = ?parsed.limit,
            "parsed query parameters"
        );
        Ok(parsed)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_integer(name: &str, value: &str) -> Result<Option<i64>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| Error::InvalidQueryParam(format!("{name} must be an integer, got '{value}'")))
}

/// A cursor must decode, unless `cursor_column` says what the raw value keys on
fn check_cursor(parsed: &QueryParams) -> Result<()> {
    let Some(token) = &parsed.cursor else {
        return Ok(());
    };
    match (decode_cursor(token), &parsed.cursor_column) {
        (Ok(cursor), Some(column)) if &cursor.column != column => Err(Error::InvalidCursor(format!(
            "cursor_column '{column}' does not match cursor column '{}'",
            cursor.column
        ))),
        (Ok(_), _) | (Err(_), Some(_)) => Ok(()),
        (Err(e), None) => Err(e),
    }
}

/// Recognize `<column>.<op>=<value>` or `<column>=<op>.<value>`
fn split_filter<'a>(key: &'a str, value: &'a str) -> Option<(&'a str, &'a str, &'a str)> {
    if let Some((column, op)) = key.rsplit_once('.') {
        if FilterOperator::from_token(op).is_some() {
            return Some((column, op, value));
        }
    }
    let (op, rest) = value.split_once('.')?;
    FilterOperator::from_token(op).map(|_| (key, op, rest))
}

/// Build a standalone filter from its column, operator token and raw value
pub(crate) fn build_filter(column: &str, op: &str, raw: &str) -> Result<Filter> {
    let operator = FilterOperator::from_token(op)
        .ok_or_else(|| Error::InvalidFilter(format!("unknown operator '{op}' on {column}")))?;
    if column.trim() == "*" {
        return Err(Error::InvalidFilter("cannot filter on '*'".to_string()));
    }
    render_column_ref(column)?;
    let value = coerce_value(operator, raw)?;
    Ok(Filter::new(column, operator, value))
}
