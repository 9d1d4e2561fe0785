//! Parsing of `select=`, `order=` and `group_by=`

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use restql_common::error::{Error, Result};

use crate::jsonb::render_column_ref;
use crate::operator::VectorOp;
use crate::params::{AggregateFunction, Aggregation, NullsOrder, OrderBy};
use crate::value::parse_vector_literal;

fn aggregate_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:([A-Za-z_][A-Za-z0-9_]*):)?([A-Za-z_][A-Za-z0-9_]*)\((.*)\)$")
            .expect("aggregate pattern is valid")
    })
}

fn vector_order_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^([A-Za-z_][A-Za-z0-9_]*)\.(vec_l2|vec_cos|vec_ip)\.(\[[^\[\]]*\])(?:\.(asc|desc))?$",
        )
        .expect("vector order pattern is valid")
    })
}

/// Split by delimiter, respecting parentheses and bracket nesting
#[must_use]
pub fn split_top_level(s: &str, delimiter: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for c in s.chars() {
        match c {
            '(' | '[' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c == delimiter && depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

/// Parse `select=` into plain columns and aggregation calls.
///
/// Unknown aggregate functions and `*` arguments to anything but `count`
/// are dropped rather than rejected.
pub fn parse_select(select: &str) -> Result<(Vec<String>, Vec<Aggregation>)> {
    let mut columns = Vec::new();
    let mut aggregations = Vec::new();

    for part in split_top_level(select, ',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some(caps) = aggregate_pattern().captures(part) {
            let alias = caps.get(1).map(|m| m.as_str().to_string());
            let func = caps[2].to_ascii_lowercase();
            let arg = caps[3].trim();
            if let Some(aggregation) = parse_aggregation(&func, arg, alias)? {
                aggregations.push(aggregation);
            } else {
                debug!(token = part, "dropping unrecognized aggregate in select");
            }
            continue;
        }

        render_column_ref(part)?;
        columns.push(part.to_string());
    }

    Ok((columns, aggregations))
}

fn parse_aggregation(func: &str, arg: &str, alias: Option<String>) -> Result<Option<Aggregation>> {
    let function = match func {
        "count" if arg == "*" => AggregateFunction::CountAll,
        "count" => AggregateFunction::Count,
        "sum" => AggregateFunction::Sum,
        "avg" => AggregateFunction::Avg,
        "min" => AggregateFunction::Min,
        "max" => AggregateFunction::Max,
        _ => return Ok(None),
    };
    if arg.is_empty() || (arg == "*" && function != AggregateFunction::CountAll) {
        return Ok(None);
    }
    if function != AggregateFunction::CountAll {
        render_column_ref(arg)?;
    }
    Ok(Some(Aggregation {
        function,
        column: arg.to_string(),
        alias,
    }))
}

/// Parse `order=`.
///
/// Entries are `column[.asc|.desc][.nullsfirst|.nullslast]`, or
/// `column.<vec_op>.[n1,n2,...][.asc|.desc]` for nearest-neighbor ordering.
/// Segments before the first modifier form the column, so `user.name.desc`
/// orders by `"user"."name"`. A malformed vector entry is read with the
/// plain grammar instead.
pub fn parse_order(order: &str) -> Result<Vec<OrderBy>> {
    let mut clauses = Vec::new();

    for part in split_top_level(order, ',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some(clause) = parse_vector_order(part) {
            clauses.push(clause);
            continue;
        }
        if part.contains("vec_") {
            debug!(token = part, "vector order did not parse, using plain order grammar");
        }

        let segments: Vec<&str> = part.split('.').collect();
        let split = segments
            .iter()
            .position(|s| is_order_modifier(s))
            .unwrap_or(segments.len());
        let column = segments[..split].join(".");
        render_column_ref(&column).map_err(|_| {
            Error::InvalidQueryParam(format!("order: invalid column '{column}'"))
        })?;

        let mut clause = OrderBy::column(column, false);
        for &segment in &segments[split..] {
            match segment {
                "asc" => clause.desc = false,
                "desc" => clause.desc = true,
                "nullsfirst" => clause.nulls = NullsOrder::First,
                "nullslast" => clause.nulls = NullsOrder::Last,
                other => debug!(modifier = other, "ignoring unknown order modifier"),
            }
        }
        clauses.push(clause);
    }

    Ok(clauses)
}

fn is_order_modifier(segment: &str) -> bool {
    matches!(segment, "asc" | "desc" | "nullsfirst" | "nullslast")
}

fn parse_vector_order(part: &str) -> Option<OrderBy> {
    let caps = vector_order_pattern().captures(part)?;
    let op = VectorOp::from_token(&caps[2])?;
    let vector = parse_vector_literal(&caps[3]).ok()?;
    let mut clause = OrderBy::nearest(&caps[1], op, vector);
    clause.desc = caps.get(4).is_some_and(|m| m.as_str() == "desc");
    Some(clause)
}

/// Parse `group_by=` into trimmed column names
pub fn parse_group_by(group_by: &str) -> Result<Vec<String>> {
    group_by
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| render_column_ref(c).map(|_| c.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_top_level() {
        assert_eq!(
            split_top_level("a,count(*),b.vec_l2.[1,2].asc", ','),
            vec!["a", "count(*)", "b.vec_l2.[1,2].asc"]
        );
    }

    #[test]
    fn test_parse_select_mixed() {
        let (columns, aggs) =
            parse_select("region,user.profile.name,count(*),sum(amount),region").unwrap();
        assert_eq!(columns, vec!["region", "user.profile.name", "region"]);
        assert_eq!(aggs.len(), 2);
        assert_eq!(aggs[0].function, AggregateFunction::CountAll);
        assert_eq!(aggs[0].output_name(), "count");
        assert_eq!(aggs[1].function, AggregateFunction::Sum);
        assert_eq!(aggs[1].output_name(), "sum_amount");
    }

    #[test]
    fn test_parse_select_lenient_aggregates() {
        let (columns, aggs) = parse_select("id,median(price),sum(*),avg(price)").unwrap();
        assert_eq!(columns, vec!["id"]);
        assert_eq!(aggs.len(), 1);
        assert_eq!(aggs[0].function, AggregateFunction::Avg);
    }

    #[test]
    fn test_parse_select_alias_and_count_column() {
        let (_, aggs) = parse_select("total:sum(amount),count(id)").unwrap();
        assert_eq!(aggs[0].output_name(), "total");
        assert_eq!(aggs[1].function, AggregateFunction::Count);
        assert_eq!(aggs[1].output_name(), "count_id");
    }

    #[test]
    fn test_parse_select_rejects_bad_identifier() {
        assert!(parse_select("id,na;me").is_err());
        assert!(parse_select("sum(am ount)").is_err());
    }

    #[test]
    fn test_parse_order() {
        let order = parse_order("created_at.desc.nullslast,name").unwrap();
        assert_eq!(order.len(), 2);
        assert!(order[0].desc);
        assert_eq!(order[0].nulls, NullsOrder::Last);
        assert!(!order[1].desc);
        assert_eq!(order[1].nulls, NullsOrder::Unspecified);
    }

    #[test]
    fn test_parse_order_unknown_modifier_ignored() {
        let order = parse_order("name.desc.sideways").unwrap();
        assert_eq!(order[0].column, "name");
        assert!(order[0].desc);
    }

    #[test]
    fn test_parse_order_qualified_column() {
        let order = parse_order("user.name.desc.nullsfirst,account.id").unwrap();
        assert_eq!(order[0].column, "user.name");
        assert!(order[0].desc);
        assert_eq!(order[0].nulls, NullsOrder::First);
        assert_eq!(order[1].column, "account.id");
        assert!(!order[1].desc);

        assert!(matches!(
            parse_order("user.bad-name.desc"),
            Err(Error::InvalidQueryParam(_))
        ));
    }

    #[test]
    fn test_parse_vector_order() {
        let order = parse_order("embedding.vec_cos.[0.1,0.2,0.3].desc,id").unwrap();
        assert_eq!(order.len(), 2);
        assert_eq!(order[0].vector_op, Some(VectorOp::Cosine));
        assert_eq!(order[0].vector_value.as_deref(), Some("[0.1,0.2,0.3]"));
        assert!(order[0].desc);
        assert!(!order[1].is_vector());
    }

    #[test]
    fn test_malformed_vector_order_falls_back() {
        let order = parse_order("embedding.vec_l2.[0.1,0.2").unwrap();
        assert_eq!(order.len(), 1);
        assert!(!order[0].is_vector());
        assert_eq!(order[0].column, "embedding");

        let order = parse_order("vec_l2.[1,2].asc").unwrap();
        assert!(!order[0].is_vector());
        assert_eq!(order[0].column, "vec_l2");

        assert!(parse_order(".vec_l2.[1,2]").is_err());
    }

    #[test]
    fn test_parse_group_by() {
        assert_eq!(
            parse_group_by(" region , status,").unwrap(),
            vec!["region", "status"]
        );
        assert!(parse_group_by("region,1bad").is_err());
    }
}
