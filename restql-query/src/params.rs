//! Parsed query model
//!
//! A [`QueryParams`] is built once per request and is read-only afterwards;
//! the SQL assembler may render it several times (data query, count query).

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::operator::{FilterOperator, VectorOp};

/// Typed filter value produced by the value coercer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// `is.null`, rendered without a parameter
    Null,
    Bool(bool),
    Text(String),
    /// `in` lists, bound as a single array parameter
    List(Vec<String>),
}

impl FilterValue {
    /// String form used by the numeric-cast decision
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// How a group of filters is combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Junction {
    And,
    Or,
}

/// One enclosing `and(...)` / `or(...)` group of a filter, outermost first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GroupFrame {
    pub id: u32,
    pub junction: Junction,
}

/// A single filter condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filter {
    pub column: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
    /// Member of an OR group
    pub is_or: bool,
    /// Innermost OR group, 0 for filters AND-joined with everything
    pub or_group_id: u32,
    /// Full chain of enclosing groups. Empty for filters built by hand, in
    /// which case grouping falls back to `or_group_id`.
    pub scope: Vec<GroupFrame>,
}

impl Filter {
    /// Standalone filter, AND-joined with every other condition
    pub fn new(column: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            column: column.into(),
            operator,
            value,
            is_or: false,
            or_group_id: 0,
            scope: Vec::new(),
        }
    }

    /// Place the filter in OR group `group_id`
    #[must_use]
    pub fn in_or_group(mut self, group_id: u32) -> Self {
        self.is_or = group_id != 0;
        self.or_group_id = group_id;
        self
    }

    /// Group chain the assembler nests this filter under
    #[must_use]
    pub fn effective_scope(&self) -> Vec<GroupFrame> {
        if !self.scope.is_empty() {
            return self.scope.clone();
        }
        if self.or_group_id == 0 {
            Vec::new()
        } else {
            vec![GroupFrame {
                id: self.or_group_id,
                junction: Junction::Or,
            }]
        }
    }
}

/// NULLS FIRST / NULLS LAST placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NullsOrder {
    #[default]
    Unspecified,
    First,
    Last,
}

/// ORDER BY entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderBy {
    pub column: String,
    pub desc: bool,
    pub nulls: NullsOrder,
    /// Nearest-neighbor ordering; exclusive with plain column ordering
    pub vector_op: Option<VectorOp>,
    /// Bracketed vector literal, e.g. `[0.1,0.2]`
    pub vector_value: Option<String>,
}

impl OrderBy {
    pub fn column(column: impl Into<String>, desc: bool) -> Self {
        Self {
            column: column.into(),
            desc,
            nulls: NullsOrder::Unspecified,
            vector_op: None,
            vector_value: None,
        }
    }

    pub fn nearest(column: impl Into<String>, op: VectorOp, vector: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            desc: false,
            nulls: NullsOrder::Unspecified,
            vector_op: Some(op),
            vector_value: Some(vector.into()),
        }
    }

    #[must_use]
    pub fn is_vector(&self) -> bool {
        self.vector_op.is_some()
    }
}

/// Aggregate functions allowed in `select=`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunction {
    Count,
    /// `count(*)`
    CountAll,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Count | Self::CountAll => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

/// Aggregation call from `select=`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aggregation {
    pub function: AggregateFunction,
    pub column: String,
    pub alias: Option<String>,
}

impl Aggregation {
    /// Output column name: explicit alias, `count` for `count(*)`, else
    /// `<func>_<col>` where `<col>` is the last segment of a qualified or
    /// JSON path reference
    #[must_use]
    pub fn output_name(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        match self.function {
            AggregateFunction::CountAll => "count".to_string(),
            func => {
                let base = self.column.rsplit(['.', '>']).next().unwrap_or(&self.column);
                format!("{}_{}", func.name(), base)
            }
        }
    }
}

/// Row-count strategy requested with `count=`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CountMode {
    Exact,
    Planned,
    Estimated,
    #[default]
    None,
}

impl CountMode {
    /// Unknown values fall back to `None`
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "exact" => Self::Exact,
            "planned" => Self::Planned,
            "estimated" => Self::Estimated,
            _ => Self::None,
        }
    }
}

/// Caller-supplied switches for a single parse
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Skip the total-results quota (page-size cap still applies)
    pub bypass_max_total_results: bool,
}

/// Parsed query parameters from a request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryParams {
    pub select: Vec<String>,
    pub aggregations: Vec<Aggregation>,
    pub group_by: Vec<String>,
    pub filters: Vec<Filter>,
    pub order: Vec<OrderBy>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub cursor: Option<String>,
    pub cursor_column: Option<String>,
    pub count: CountMode,
    pub truncate_length: Option<i64>,
}

impl QueryParams {
    /// Shorten string fields of a result row to `truncate_length` characters
    pub fn truncate_row(&self, row: &mut JsonValue) {
        let Some(max) = self.truncate_length.and_then(|n| usize::try_from(n).ok()) else {
            return;
        };
        truncate_strings(row, max);
    }
}

fn truncate_strings(value: &mut JsonValue, max: usize) {
    match value {
        JsonValue::String(s) => {
            if let Some((idx, _)) = s.char_indices().nth(max) {
                s.truncate(idx);
            }
        }
        JsonValue::Array(items) => items.iter_mut().for_each(|v| truncate_strings(v, max)),
        JsonValue::Object(map) => map.values_mut().for_each(|v| truncate_strings(v, max)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_aggregation_output_names() {
        let count_all = Aggregation {
            function: AggregateFunction::CountAll,
            column: "*".to_string(),
            alias: None,
        };
        assert_eq!(count_all.output_name(), "count");

        let sum = Aggregation {
            function: AggregateFunction::Sum,
            column: "amount".to_string(),
            alias: None,
        };
        assert_eq!(sum.output_name(), "sum_amount");

        let nested = Aggregation {
            function: AggregateFunction::Max,
            column: "data->stats->>score".to_string(),
            alias: None,
        };
        assert_eq!(nested.output_name(), "max_score");

        let aliased = Aggregation {
            alias: Some("total".to_string()),
            ..sum
        };
        assert_eq!(aliased.output_name(), "total");
    }

    #[test]
    fn test_effective_scope_from_group_id() {
        let plain = Filter::new("a", FilterOperator::Eq, "1".into());
        assert!(plain.effective_scope().is_empty());

        let grouped = Filter::new("a", FilterOperator::Eq, "1".into()).in_or_group(3);
        assert!(grouped.is_or);
        assert_eq!(
            grouped.effective_scope(),
            vec![GroupFrame {
                id: 3,
                junction: Junction::Or
            }]
        );
    }

    #[test]
    fn test_count_mode_parse() {
        assert_eq!(CountMode::parse("exact"), CountMode::Exact);
        assert_eq!(CountMode::parse("planned"), CountMode::Planned);
        assert_eq!(CountMode::parse("estimated"), CountMode::Estimated);
        assert_eq!(CountMode::parse("EXACT"), CountMode::None);
        assert_eq!(CountMode::parse(""), CountMode::None);
    }

    #[test]
    fn test_truncate_row() {
        let params = QueryParams {
            truncate_length: Some(3),
            ..Default::default()
        };
        let mut row = json!({"name": "Alexander", "tags": ["héllo", "ok"], "n": 12345});
        params.truncate_row(&mut row);
        assert_eq!(row, json!({"name": "Ale", "tags": ["hél", "ok"], "n": 12345}));
    }

    #[test]
    fn test_truncate_row_unset() {
        let params = QueryParams::default();
        let mut row = json!({"name": "Alexander"});
        params.truncate_row(&mut row);
        assert_eq!(row["name"], "Alexander");
    }
}
