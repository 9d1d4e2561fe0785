//! SQL assembly from a parsed [`QueryParams`]
//!
//! Every value is bound as a positional parameter; identifiers go through the
//! whitelist quoter. Parameter numbering runs through one [`SqlParams`] per
//! statement, so placeholders are contiguous from WHERE through OFFSET.

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::trace;

use restql_common::error::{Error, Result};
use restql_common::types::TableInfo;

use crate::cursor::{decode_cursor, Cursor};
use crate::identifier::{quote_identifier, require_identifier};
use crate::jsonb::{render_column_ref, JsonPath};
use crate::operator::{FilterOperator, OperatorKind};
use crate::params::{
    AggregateFunction, CountMode, Filter, FilterValue, GroupFrame, Junction, NullsOrder, OrderBy,
    QueryParams,
};
use crate::parser::build_filter;
use crate::value::{
    needs_numeric_cast, parse_distance_geometry, parse_geometry, parse_in_list, parse_is_value,
    parse_vector_threshold,
};

/// Ordered bind values for one statement
#[derive(Debug, Clone, Default)]
pub struct SqlParams {
    values: Vec<JsonValue>,
}

impl SqlParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value and return its placeholder
    pub fn push(&mut self, value: impl Into<JsonValue>) -> String {
        self.values.push(value.into());
        format!("${}", self.values.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn into_values(self) -> Vec<JsonValue> {
        self.values
    }
}

/// SQL text plus its positional parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<JsonValue>,
}

/// Builds statements for one table
#[derive(Debug, Clone)]
pub struct SqlAssembler<'a> {
    schema: &'a str,
    table: &'a str,
    info: Option<&'a TableInfo>,
    validate_columns: bool,
}

impl<'a> SqlAssembler<'a> {
    #[must_use]
    pub fn new(table: &'a str) -> Self {
        Self {
            schema: "public",
            table,
            info: None,
            validate_columns: false,
        }
    }

    /// Assembler driven by cached table metadata
    #[must_use]
    pub fn for_table(info: &'a TableInfo) -> Self {
        Self {
            schema: &info.schema,
            table: &info.name,
            info: Some(info),
            validate_columns: false,
        }
    }

    #[must_use]
    pub fn with_schema(mut self, schema: &'a str) -> Self {
        self.schema = schema;
        self
    }

    #[must_use]
    pub fn with_table_info(mut self, info: &'a TableInfo) -> Self {
        self.info = Some(info);
        self
    }

    /// Reject references to columns the table metadata does not list
    #[must_use]
    pub fn validate_columns(mut self, enabled: bool) -> Self {
        self.validate_columns = enabled;
        self
    }

    /// Quoted `"schema"."table"`
    pub fn table_ref(&self) -> Result<String> {
        Ok(format!(
            "{}.{}",
            require_identifier(self.schema)?,
            require_identifier(self.table)?
        ))
    }

    /// Data query: SELECT, WHERE (filters and keyset cursor), GROUP BY,
    /// ORDER BY, LIMIT, OFFSET
    pub fn select(&self, params: &QueryParams) -> Result<CompiledQuery> {
        self.check_columns(params)?;

        let mut args = SqlParams::new();
        let mut sql = format!(
            "SELECT {} FROM {}",
            build_select_clause(params, self.info)?,
            self.table_ref()?
        );

        let mut conditions = Vec::new();
        if let Some(filters) = build_where_clause(&params.filters, &mut args)? {
            conditions.push(filters);
        }
        if let Some(keyset) = build_cursor_predicate(params, &mut args)? {
            conditions.push(keyset);
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        if let Some(group_by) = build_group_by_clause(&params.group_by)? {
            sql.push_str(" GROUP BY ");
            sql.push_str(&group_by);
        }
        if let Some(order) = build_order_clause(&params.order, &mut args)? {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order);
        }
        sql.push_str(&build_limit_offset(params.limit, params.offset, &mut args));

        trace!(sql = %sql, params = args.len(), "assembled select");
        Ok(CompiledQuery {
            sql,
            params: args.into_values(),
        })
    }

    /// Row-count statement for `count=`, or `None` when no count was requested.
    ///
    /// Counts ignore the cursor and pagination window.
    pub fn count(&self, params: &QueryParams) -> Result<Option<CompiledQuery>> {
        let head = match params.count {
            CountMode::None => return Ok(None),
            CountMode::Exact => "SELECT COUNT(*) FROM",
            CountMode::Planned | CountMode::Estimated => "EXPLAIN (FORMAT JSON) SELECT 1 FROM",
        };
        self.check_columns(params)?;

        let mut args = SqlParams::new();
        let mut sql = format!("{head} {}", self.table_ref()?);
        if let Some(filters) = build_where_clause(&params.filters, &mut args)? {
            sql.push_str(" WHERE ");
            sql.push_str(&filters);
        }

        trace!(sql = %sql, params = args.len(), "assembled count");
        Ok(Some(CompiledQuery {
            sql,
            params: args.into_values(),
        }))
    }

    fn check_columns(&self, params: &QueryParams) -> Result<()> {
        let Some(info) = self.info.filter(|_| self.validate_columns) else {
            return Ok(());
        };

        let referenced = params
            .select
            .iter()
            .chain(
                params
                    .aggregations
                    .iter()
                    .filter(|a| a.function != AggregateFunction::CountAll)
                    .map(|a| &a.column),
            )
            .chain(params.filters.iter().map(|f| &f.column))
            .chain(params.order.iter().map(|o| &o.column))
            .chain(params.group_by.iter())
            .chain(params.cursor_column.iter());

        for reference in referenced {
            if let Some(column) = base_column(reference) {
                if !info.has_column(column) {
                    return Err(Error::ColumnNotFound(format!(
                        "column '{column}' does not exist on '{}'",
                        info.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Table column a reference reads from; `None` for `*` and qualified names
fn base_column(reference: &str) -> Option<&str> {
    if reference == "*" {
        return None;
    }
    match reference.find("->") {
        Some(end) => Some(&reference[..end]),
        None if reference.contains('.') => None,
        None => Some(reference),
    }
}

/// Render the select list: plain columns first, then aggregations
pub fn build_select_clause(params: &QueryParams, info: Option<&TableInfo>) -> Result<String> {
    let mut items = Vec::new();

    if params.select.is_empty() && params.aggregations.is_empty() {
        items.push(render_star(info));
    }

    for column in &params.select {
        items.push(render_select_column(column, info)?);
    }

    for aggregation in &params.aggregations {
        let call = match aggregation.function {
            AggregateFunction::CountAll => "COUNT(*)".to_string(),
            func => format!(
                "{}({})",
                func.name().to_ascii_uppercase(),
                render_column_ref(&aggregation.column)?
            ),
        };
        items.push(with_alias(call, &aggregation.output_name()));
    }

    Ok(items.join(", "))
}

fn render_star(info: Option<&TableInfo>) -> String {
    match info {
        Some(table) if table.has_spatial_columns() => table
            .columns
            .iter()
            .map(|c| {
                let quoted = quote_identifier(&c.name);
                if c.is_spatial() {
                    format!("ST_AsGeoJSON({quoted})::jsonb AS {quoted}")
                } else {
                    quoted
                }
            })
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => "*".to_string(),
    }
}

fn render_select_column(column: &str, info: Option<&TableInfo>) -> Result<String> {
    if column == "*" {
        return Ok(render_star(info));
    }
    if column.contains("->") {
        let path = JsonPath::parse(column)?;
        return Ok(with_alias(path.to_sql(), path.output_name()));
    }
    let rendered = render_column_ref(column)?;
    let spatial = info
        .and_then(|t| t.column(column))
        .is_some_and(|c| c.is_spatial());
    if spatial {
        Ok(format!("ST_AsGeoJSON({rendered})::jsonb AS {rendered}"))
    } else {
        Ok(rendered)
    }
}

/// `expr AS "alias"`, or the bare expression when the alias is not a safe identifier
fn with_alias(expr: String, alias: &str) -> String {
    let quoted = quote_identifier(alias);
    if quoted.is_empty() {
        expr
    } else {
        format!("{expr} AS {quoted}")
    }
}

/// Render the WHERE condition for `filters`, binding values into `args`.
///
/// Filters sharing a group are parenthesized together and joined by the
/// group's junction; top-level entries are joined with `AND`. A group is
/// placed where its first member appears.
pub fn build_where_clause(filters: &[Filter], args: &mut SqlParams) -> Result<Option<String>> {
    if filters.is_empty() {
        return Ok(None);
    }
    let scopes: Vec<Vec<GroupFrame>> = filters.iter().map(Filter::effective_scope).collect();
    let members: Vec<usize> = (0..filters.len()).collect();
    render_level(filters, &scopes, &members, 0, Junction::And, args)
}

enum Slot {
    Leaf(usize),
    Group(GroupFrame, Vec<usize>),
}

fn render_level(
    filters: &[Filter],
    scopes: &[Vec<GroupFrame>],
    members: &[usize],
    depth: usize,
    junction: Junction,
    args: &mut SqlParams,
) -> Result<Option<String>> {
    let mut slots: Vec<Slot> = Vec::new();
    for &idx in members {
        let Some(frame) = scopes[idx].get(depth) else {
            slots.push(Slot::Leaf(idx));
            continue;
        };
        let existing = slots
            .iter()
            .position(|s| matches!(s, Slot::Group(f, _) if f.id == frame.id));
        match existing {
            Some(pos) => {
                if let Slot::Group(_, group) = &mut slots[pos] {
                    group.push(idx);
                }
            }
            None => slots.push(Slot::Group(*frame, vec![idx])),
        }
    }

    let mut parts = Vec::with_capacity(slots.len());
    for slot in slots {
        match slot {
            Slot::Leaf(idx) => parts.push(render_filter(&filters[idx], args)?),
            Slot::Group(frame, group) => {
                if let Some(inner) =
                    render_level(filters, scopes, &group, depth + 1, frame.junction, args)?
                {
                    parts.push(format!("({inner})"));
                }
            }
        }
    }

    let separator = match junction {
        Junction::And => " AND ",
        Junction::Or => " OR ",
    };
    Ok((!parts.is_empty()).then(|| parts.join(separator)))
}

fn text_value(filter: &Filter) -> Result<&str> {
    match &filter.value {
        FilterValue::Text(text) => Ok(text),
        other => Err(Error::InvalidFilter(format!(
            "{} on {} expects a text value, got {other:?}",
            filter.operator.token(),
            filter.column
        ))),
    }
}

/// Render one condition
pub fn render_filter(filter: &Filter, args: &mut SqlParams) -> Result<String> {
    let lhs = render_column_ref(&filter.column)?;
    let op = filter.operator;

    match op.kind() {
        OperatorKind::Binary => render_binary(filter, &lhs, args),
        OperatorKind::Is => {
            let value = match &filter.value {
                FilterValue::Text(text) => parse_is_value(text)?,
                other => other.clone(),
            };
            match value {
                FilterValue::Null => Ok(format!("{lhs} IS NULL")),
                FilterValue::Bool(b) => Ok(format!("{lhs} IS {}", args.push(b))),
                other => Err(Error::InvalidFilter(format!(
                    "Invalid IS value on {}: {other:?}",
                    filter.column
                ))),
            }
        }
        OperatorKind::Membership => {
            let items = match &filter.value {
                FilterValue::List(items) => items.clone(),
                FilterValue::Text(text) => parse_in_list(text),
                other => {
                    return Err(Error::InvalidFilter(format!(
                        "in on {} expects a list, got {other:?}",
                        filter.column
                    )))
                }
            };
            Ok(format!("{lhs} = ANY({})", args.push(items)))
        }
        OperatorKind::FullText => {
            let query = text_value(filter)?;
            Ok(format!("{lhs} @@ {}({})", op.sql(), args.push(query)))
        }
        OperatorKind::Spatial => {
            let geometry = parse_geometry(text_value(filter)?)?;
            Ok(format!(
                "{}({lhs}, ST_GeomFromGeoJSON({}))",
                op.sql(),
                args.push(geometry)
            ))
        }
        OperatorKind::SpatialDistance => {
            let (distance, geometry) = parse_distance_geometry(text_value(filter)?)?;
            let geometry = args.push(geometry);
            let distance = args.push(distance);
            if op == FilterOperator::StDwithin {
                Ok(format!(
                    "ST_DWithin({lhs}, ST_GeomFromGeoJSON({geometry}), {distance})"
                ))
            } else {
                Ok(format!(
                    "ST_Distance({lhs}, ST_GeomFromGeoJSON({geometry})) <= {distance}"
                ))
            }
        }
        OperatorKind::Vector => {
            let (vector, threshold) = parse_vector_threshold(text_value(filter)?)?;
            let vector = args.push(vector);
            let threshold = args.push(threshold);
            Ok(format!("({lhs} {} {vector}::vector) <= {threshold}", op.sql()))
        }
        OperatorKind::Negation => {
            let remainder = text_value(filter)?;
            let (inner_op, raw) = remainder.split_once('.').ok_or_else(|| {
                Error::InvalidFilter(format!(
                    "not on {} expects '<op>.<value>', got '{remainder}'",
                    filter.column
                ))
            })?;
            if inner_op == FilterOperator::Not.token() {
                return Err(Error::InvalidFilter(format!(
                    "nested not on {} is not supported",
                    filter.column
                )));
            }
            let inner = build_filter(&filter.column, inner_op, raw)?;
            Ok(format!("NOT ({})", render_filter(&inner, args)?))
        }
    }
}

fn render_binary(filter: &Filter, lhs: &str, args: &mut SqlParams) -> Result<String> {
    let op = filter.operator;
    match &filter.value {
        FilterValue::Text(text) if op.is_comparison() && needs_numeric_cast(&filter.column, &filter.value) => {
            Ok(format!("({lhs})::numeric {} {}::numeric", op.sql(), args.push(text.as_str())))
        }
        FilterValue::Text(text) => Ok(format!("{lhs} {} {}", op.sql(), args.push(text.as_str()))),
        FilterValue::Bool(b) => Ok(format!("{lhs} {} {}", op.sql(), args.push(*b))),
        // arrays on the equality path bind as-is
        FilterValue::List(items) => Ok(format!("{lhs} {} {}", op.sql(), args.push(items.clone()))),
        FilterValue::Null => match op {
            FilterOperator::Eq => Ok(format!("{lhs} IS NULL")),
            FilterOperator::Neq => Ok(format!("{lhs} IS NOT NULL")),
            _ => Err(Error::InvalidFilter(format!(
                "{} on {} cannot compare against null",
                op.token(),
                filter.column
            ))),
        },
    }
}

/// Render GROUP BY columns
pub fn build_group_by_clause(group_by: &[String]) -> Result<Option<String>> {
    if group_by.is_empty() {
        return Ok(None);
    }
    let columns = group_by
        .iter()
        .map(|c| render_column_ref(c))
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(columns.join(", ")))
}

/// Render ORDER BY entries; nearest-neighbor entries bind their vector
pub fn build_order_clause(order: &[OrderBy], args: &mut SqlParams) -> Result<Option<String>> {
    if order.is_empty() {
        return Ok(None);
    }

    let mut clauses = Vec::with_capacity(order.len());
    for entry in order {
        let column = render_column_ref(&entry.column)?;
        let dir = if entry.desc { "DESC" } else { "ASC" };
        if let (Some(op), Some(vector)) = (entry.vector_op, &entry.vector_value) {
            clauses.push(format!(
                "{column} {} {}::vector {dir}",
                op.sql(),
                args.push(vector.as_str())
            ));
            continue;
        }
        let nulls = match entry.nulls {
            NullsOrder::First => " NULLS FIRST",
            NullsOrder::Last => " NULLS LAST",
            NullsOrder::Unspecified => "",
        };
        clauses.push(format!("{column} {dir}{nulls}"));
    }

    Ok(Some(clauses.join(", ")))
}

/// ` LIMIT $n OFFSET $m`, each part only when set
pub fn build_limit_offset(limit: Option<i64>, offset: Option<i64>, args: &mut SqlParams) -> String {
    let mut sql = String::new();
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", args.push(limit)));
    }
    if let Some(offset) = offset {
        sql.push_str(&format!(" OFFSET {}", args.push(offset)));
    }
    sql
}

/// Keyset position of a request.
///
/// A codec token is used as decoded. A raw value is accepted only together
/// with `cursor_column`, taking its direction from the matching order entry.
pub fn resolve_cursor(params: &QueryParams) -> Result<Option<Cursor>> {
    let Some(token) = &params.cursor else {
        return Ok(None);
    };
    match (decode_cursor(token), &params.cursor_column) {
        (Ok(cursor), Some(column)) if &cursor.column != column => Err(Error::InvalidCursor(
            format!("cursor_column '{column}' does not match cursor column '{}'", cursor.column),
        )),
        (Ok(cursor), _) => Ok(Some(cursor)),
        (Err(_), Some(column)) => {
            let desc = params
                .order
                .iter()
                .find(|o| !o.is_vector() && &o.column == column)
                .is_some_and(|o| o.desc);
            Ok(Some(Cursor {
                column: column.clone(),
                value: JsonValue::String(token.clone()),
                desc,
            }))
        }
        (Err(e), None) => Err(e),
    }
}

/// `"col" > $n` (ascending) or `"col" < $n` (descending) for the cursor, if any
pub fn build_cursor_predicate(params: &QueryParams, args: &mut SqlParams) -> Result<Option<String>> {
    let Some(cursor) = resolve_cursor(params)? else {
        return Ok(None);
    };
    let column = require_identifier(&cursor.column)?;
    let cmp = if cursor.desc { "<" } else { ">" };
    Ok(Some(format!("{column} {cmp} {}", args.push(cursor.value))))
}

/// Quoted primary-key column list for `ON CONFLICT (...)`
pub fn conflict_target(info: &TableInfo) -> Result<Option<String>> {
    let Some(keys) = info.primary_key.as_ref().filter(|k| !k.is_empty()) else {
        return Ok(None);
    };
    let quoted = keys
        .iter()
        .map(|k| require_identifier(k))
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(quoted.join(", ")))
}
