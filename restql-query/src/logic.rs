//! Logical expression parsing for `and=(...)` / `or=(...)`
//!
//! Groups are tracked with an explicit stack; commas split expressions only
//! at the current group's level, never inside a nested group or a value's
//! own parentheses (`status.in.(a,b)`).

use restql_common::error::{Error, Result};

use crate::params::{Filter, GroupFrame, Junction};
use crate::parser::build_filter;

/// Deepest `and(...)`/`or(...)` nesting accepted in one expression
pub const MAX_GROUP_DEPTH: usize = 32;

/// Assigns group identifiers for one request.
///
/// Shared across every logic key of a request so unrelated expressions never
/// reuse an identifier.
#[derive(Debug, Default)]
pub struct GroupCounter {
    last: u32,
}

impl GroupCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> u32 {
        self.last += 1;
        self.last
    }
}

struct OpenGroup {
    /// Whether this group pushed a frame onto the scope
    pushed: bool,
}

/// Parse the value of an `and`/`or` key into a flat, scope-annotated filter list
pub fn parse_logic(
    junction: Junction,
    raw: &str,
    groups: &mut GroupCounter,
) -> Result<Vec<Filter>> {
    let key = match junction {
        Junction::And => "and",
        Junction::Or => "or",
    };
    if !raw.trim_start().starts_with('(') {
        return Err(Error::InvalidFilter(format!(
            "{key} expression must be wrapped in parentheses: {raw}"
        )));
    }
    parse_group_expression(&format!("{key}{raw}"), key, groups)
}

fn parse_group_expression(
    input: &str,
    key: &str,
    groups: &mut GroupCounter,
) -> Result<Vec<Filter>> {
    let unbalanced = || Error::UnbalancedParentheses(format!("{key}= expression"));

    let mut filters = Vec::new();
    let mut scope: Vec<GroupFrame> = Vec::new();
    let mut open: Vec<OpenGroup> = Vec::new();
    let mut buf = String::new();
    let mut value_depth = 0usize;
    let mut in_quotes = false;
    let mut expecting = false;
    let mut after_group = false;
    let mut seen_group = false;
    let mut closed = false;

    for c in input.chars() {
        if in_quotes {
            buf.push(c);
            if c == '"' {
                in_quotes = false;
            }
            continue;
        }
        if closed {
            if c == ')' {
                return Err(unbalanced());
            }
            if !c.is_whitespace() {
                return Err(Error::InvalidFilter(format!(
                    "unexpected content after {key}= expression"
                )));
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                expecting = false;
                buf.push(c);
            }
            '(' if value_depth == 0 && matches!(buf.trim(), "and" | "or") => {
                let junction = if buf.trim() == "and" {
                    Junction::And
                } else {
                    Junction::Or
                };
                if after_group {
                    return Err(Error::InvalidFilter(format!(
                        "missing ',' before nested {} group",
                        buf.trim()
                    )));
                }
                buf.clear();
                if open.len() >= MAX_GROUP_DEPTH {
                    return Err(Error::InvalidFilter(format!(
                        "{key}= expression nests deeper than {MAX_GROUP_DEPTH} groups"
                    )));
                }
                let inherits = match scope.last() {
                    Some(frame) => frame.junction == junction,
                    // a top-level AND group is AND-joined with everything anyway
                    None => junction == Junction::And,
                };
                if !inherits {
                    scope.push(GroupFrame {
                        id: groups.next_id(),
                        junction,
                    });
                }
                open.push(OpenGroup { pushed: !inherits });
                seen_group = true;
                expecting = true;
            }
            '(' => {
                if open.is_empty() {
                    return Err(Error::InvalidFilter(format!(
                        "unexpected '(' in {key}= expression"
                    )));
                }
                value_depth += 1;
                expecting = false;
                buf.push(c);
            }
            ')' if value_depth > 0 => {
                value_depth -= 1;
                buf.push(c);
            }
            ')' => {
                let group = open.pop().ok_or_else(unbalanced)?;
                flush(&mut buf, expecting, after_group, &scope, &mut filters, key)?;
                if group.pushed {
                    scope.pop();
                }
                expecting = false;
                after_group = true;
                closed = open.is_empty();
            }
            ',' if value_depth == 0 => {
                if open.is_empty() {
                    return Err(unbalanced());
                }
                flush(&mut buf, expecting, after_group, &scope, &mut filters, key)?;
                expecting = true;
                after_group = false;
            }
            c => {
                if !c.is_whitespace() {
                    expecting = false;
                }
                buf.push(c);
            }
        }
    }

    if in_quotes {
        return Err(Error::InvalidFilter(format!(
            "unterminated quote in {key}= expression"
        )));
    }
    if !seen_group || !open.is_empty() || value_depth > 0 {
        return Err(unbalanced());
    }
    Ok(filters)
}

/// Turn the buffered `column.op.value` text into a filter in the current scope
fn flush(
    buf: &mut String,
    expecting: bool,
    after_group: bool,
    scope: &[GroupFrame],
    filters: &mut Vec<Filter>,
    key: &str,
) -> Result<()> {
    let expr = buf.trim().to_string();
    buf.clear();
    if expr.is_empty() {
        if expecting {
            return Err(Error::InvalidFilter(format!(
                "empty expression in {key}= expression"
            )));
        }
        return Ok(());
    }
    if after_group {
        return Err(Error::InvalidFilter(format!(
            "missing ',' before '{expr}' in {key}= expression"
        )));
    }

    let (column, rest) = expr.split_once('.').ok_or_else(|| {
        Error::InvalidFilter(format!("expected column.operator.value but got: {expr}"))
    })?;
    let (op, value) = rest.split_once('.').ok_or_else(|| {
        Error::InvalidFilter(format!("expected column.operator.value but got: {expr}"))
    })?;

    let mut filter = build_filter(column, op, unquote_value(value))?;
    let or_group_id = scope
        .iter()
        .rev()
        .find(|f| f.junction == Junction::Or)
        .map_or(0, |f| f.id);
    filter.is_or = or_group_id != 0;
    filter.or_group_id = or_group_id;
    filter.scope = scope.to_vec();
    filters.push(filter);
    Ok(())
}

/// Values may be double-quoted to protect reserved characters
fn unquote_value(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::FilterOperator;
    use crate::params::FilterValue;

    fn parse(junction: Junction, raw: &str) -> Result<Vec<Filter>> {
        parse_logic(junction, raw, &mut GroupCounter::new())
    }

    #[test]
    fn test_simple_or_group() {
        let filters = parse(Junction::Or, "(name.is.null,status.is.true,active.is.false)").unwrap();
        assert_eq!(filters.len(), 3);
        assert!(filters.iter().all(|f| f.is_or && f.or_group_id == 1));
        assert_eq!(filters[0].value, FilterValue::Null);
        assert_eq!(filters[1].value, FilterValue::Bool(true));
        assert_eq!(filters[2].value, FilterValue::Bool(false));
    }

    #[test]
    fn test_top_level_and_is_ungrouped() {
        let filters = parse(Junction::And, "(age.gte.18,status.eq.active)").unwrap();
        assert_eq!(filters.len(), 2);
        assert!(filters.iter().all(|f| !f.is_or && f.or_group_id == 0));
        assert!(filters.iter().all(|f| f.scope.is_empty()));
        assert_eq!(filters[0].operator, FilterOperator::Gte);
    }

    #[test]
    fn test_nested_and_inside_or() {
        let filters = parse(Junction::Or, "(a.eq.1,and(b.eq.2,c.eq.3))").unwrap();
        assert_eq!(filters.len(), 3);
        assert_eq!(filters[0].scope.len(), 1);
        assert_eq!(filters[1].scope.len(), 2);
        assert_eq!(filters[1].scope[1].junction, Junction::And);
        assert_eq!(filters[1].scope, filters[2].scope);
        assert!(filters.iter().all(|f| f.or_group_id == 1));
    }

    #[test]
    fn test_nested_or_inside_and_gets_fresh_group() {
        let mut groups = GroupCounter::new();
        let filters = parse_logic(
            Junction::And,
            "(a.eq.1,or(b.eq.2,c.eq.3),or(d.eq.4,e.eq.5))",
            &mut groups,
        )
        .unwrap();
        assert_eq!(filters[0].or_group_id, 0);
        assert_eq!(filters[1].or_group_id, 1);
        assert_eq!(filters[2].or_group_id, 1);
        assert_eq!(filters[3].or_group_id, 2);
        assert_eq!(filters[4].or_group_id, 2);
    }

    #[test]
    fn test_counter_shared_across_expressions() {
        let mut groups = GroupCounter::new();
        let first = parse_logic(Junction::Or, "(a.eq.1,b.eq.2)", &mut groups).unwrap();
        let second = parse_logic(Junction::Or, "(c.eq.3,d.eq.4)", &mut groups).unwrap();
        assert_eq!(first[0].or_group_id, 1);
        assert_eq!(second[0].or_group_id, 2);
    }

    #[test]
    fn test_value_parentheses_do_not_split() {
        let filters = parse(Junction::Or, "(status.in.(active,pending),age.gt.30)").unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(
            filters[0].value,
            FilterValue::List(vec!["active".to_string(), "pending".to_string()])
        );
    }

    #[test]
    fn test_not_passthrough() {
        let filters = parse(Junction::Or, "(status.not.eq.deleted,age.lt.5)").unwrap();
        assert_eq!(filters[0].operator, FilterOperator::Not);
        assert_eq!(filters[0].value, FilterValue::Text("eq.deleted".to_string()));
    }

    #[test]
    fn test_quoted_value_with_comma() {
        let filters = parse(Junction::Or, "(name.eq.\"Smith, John\",name.eq.Doe)").unwrap();
        assert_eq!(filters[0].value, FilterValue::Text("Smith, John".to_string()));
    }

    #[test]
    fn test_unbalanced_parentheses() {
        for raw in [
            "(a.eq.1",
            "(a.eq.1))",
            "(a.eq.1,and(b.eq.2)",
            "(a.eq.1,or(b.eq.2,and(c.eq.3))",
            "((a.eq.1)",
            "(a.in.(1,2)",
        ] {
            let err = parse(Junction::Or, raw).unwrap_err();
            assert!(
                matches!(err, Error::UnbalancedParentheses(_) | Error::InvalidFilter(_)),
                "{raw}: {err}"
            );
        }
        assert!(matches!(
            parse(Junction::Or, "(a.eq.1))").unwrap_err(),
            Error::UnbalancedParentheses(_)
        ));
        assert!(matches!(
            parse(Junction::And, "(a.eq.1,or(b.eq.2)").unwrap_err(),
            Error::UnbalancedParentheses(_)
        ));
    }

    #[test]
    fn test_malformed_expressions() {
        assert!(parse(Junction::Or, "a.eq.1,b.eq.2").is_err());
        assert!(parse(Junction::Or, "()").is_err());
        assert!(parse(Junction::Or, "(a.eq.1,)").is_err());
        assert!(parse(Junction::Or, "(a.eq)").is_err());
        assert!(parse(Junction::Or, "(a.bogus.1)").is_err());
        assert!(parse(Junction::Or, "(a.eq.1) trailing").is_err());
    }

    #[test]
    fn test_depth_limit() {
        let deep = format!(
            "({}a.eq.1{})",
            "and(or(".repeat(MAX_GROUP_DEPTH),
            "))".repeat(MAX_GROUP_DEPTH)
        );
        assert!(parse(Junction::Or, &deep).is_err());
    }
}
