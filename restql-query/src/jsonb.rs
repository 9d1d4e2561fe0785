//! JSONB path references such as `data->stats->>count`

use restql_common::error::{Error, Result};

use crate::identifier::{quote_column, require_identifier};

/// One `->` / `->>` step of a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub key: PathKey,
    /// `->>` (text extraction) rather than `->` (JSON value)
    pub as_text: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathKey {
    /// Object key, rendered as a string literal
    Field(String),
    /// Array index, rendered bare
    Index(i64),
}

/// A column reference with optional JSON traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    pub column: String,
    pub segments: Vec<PathSegment>,
}

impl JsonPath {
    /// Parse `column ('->' segment | '->>' segment)*`.
    ///
    /// The leading column must be a valid identifier. Interior keys are
    /// emitted as string literals, so they may hold any text except control
    /// characters.
    pub fn parse(reference: &str) -> Result<Self> {
        let mut rest = reference;
        let column_end = rest.find("->").unwrap_or(rest.len());
        let column = rest[..column_end].to_string();
        require_identifier(&column)?;
        rest = &rest[column_end..];

        let mut segments = Vec::new();
        while !rest.is_empty() {
            // rest always starts with "->" here
            let (as_text, body) = match rest.strip_prefix("->>") {
                Some(body) => (true, body),
                None => (false, &rest[2..]),
            };
            let end = body.find("->").unwrap_or(body.len());
            let raw = &body[..end];
            segments.push(PathSegment {
                key: parse_key(raw, reference)?,
                as_text,
            });
            rest = &body[end..];
        }

        Ok(Self { column, segments })
    }

    /// Whether the reference traverses into the JSON document at all
    #[must_use]
    pub fn is_nested(&self) -> bool {
        !self.segments.is_empty()
    }

    /// Whether the final step extracts text (`->>`)
    #[must_use]
    pub fn yields_text(&self) -> bool {
        self.segments.last().is_some_and(|s| s.as_text)
    }

    /// Name used for the output column: the last object key, or the column itself
    #[must_use]
    pub fn output_name(&self) -> &str {
        self.segments
            .iter()
            .rev()
            .find_map(|s| match &s.key {
                PathKey::Field(name) => Some(name.as_str()),
                PathKey::Index(_) => None,
            })
            .unwrap_or(&self.column)
    }

    /// Render the access chain
    #[must_use]
    pub fn to_sql(&self) -> String {
        let mut sql = format!("\"{}\"", self.column);
        for segment in &self.segments {
            sql.push_str(if segment.as_text { "->>" } else { "->" });
            match &segment.key {
                PathKey::Field(name) => {
                    sql.push('\'');
                    sql.push_str(&name.replace('\'', "''"));
                    sql.push('\'');
                }
                PathKey::Index(idx) => sql.push_str(&idx.to_string()),
            }
        }
        sql
    }
}

fn parse_key(raw: &str, reference: &str) -> Result<PathKey> {
    if raw.is_empty() {
        return Err(Error::InvalidIdentifier(format!(
            "empty JSON path segment in '{reference}'"
        )));
    }
    if raw.chars().any(char::is_control) {
        return Err(Error::InvalidIdentifier(format!(
            "JSON path segment in '{reference}' contains control characters"
        )));
    }
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(idx) = raw.parse::<i64>() {
            return Ok(PathKey::Index(idx));
        }
    }
    Ok(PathKey::Field(raw.to_string()))
}

/// Render a column reference, resolving any JSON path it contains
pub fn parse_jsonb_path(column: &str) -> Result<String> {
    Ok(JsonPath::parse(column)?.to_sql())
}

/// Render a select/order/group-by reference: `*`, a qualified column
/// (`user.profile.name`) or a JSON path (`data->>name`)
pub fn render_column_ref(reference: &str) -> Result<String> {
    if reference.contains("->") {
        parse_jsonb_path(reference)
    } else {
        quote_column(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_column() {
        let path = JsonPath::parse("status").unwrap();
        assert!(!path.is_nested());
        assert_eq!(path.to_sql(), "\"status\"");
        assert_eq!(path.output_name(), "status");
    }

    #[test]
    fn test_nested_text_path() {
        assert_eq!(
            parse_jsonb_path("data->stats->>count").unwrap(),
            "\"data\"->'stats'->>'count'"
        );
        let path = JsonPath::parse("data->stats->>count").unwrap();
        assert!(path.yields_text());
        assert_eq!(path.output_name(), "count");
    }

    #[test]
    fn test_array_index() {
        assert_eq!(
            parse_jsonb_path("data->items->0->>name").unwrap(),
            "\"data\"->'items'->0->>'name'"
        );
        assert!(!JsonPath::parse("data->items->0").unwrap().yields_text());
    }

    #[test]
    fn test_interior_text_step_allowed() {
        assert_eq!(
            parse_jsonb_path("data->>a->b").unwrap(),
            "\"data\"->>'a'->'b'"
        );
    }

    #[test]
    fn test_quote_in_key_is_doubled() {
        assert_eq!(
            parse_jsonb_path("data->>it's").unwrap(),
            "\"data\"->>'it''s'"
        );
    }

    #[test]
    fn test_render_column_ref() {
        assert_eq!(render_column_ref("*").unwrap(), "*");
        assert_eq!(render_column_ref("user.name").unwrap(), "\"user\".\"name\"");
        assert_eq!(render_column_ref("data->>name").unwrap(), "\"data\"->>'name'");
        assert!(render_column_ref("na me").is_err());
    }

    #[test]
    fn test_invalid_paths() {
        assert!(parse_jsonb_path("1data->x").is_err());
        assert!(parse_jsonb_path("data->").is_err());
        assert!(parse_jsonb_path("data->->x").is_err());
        assert!(parse_jsonb_path("data->a\nb").is_err());
        assert!(parse_jsonb_path("->x").is_err());
    }
}
