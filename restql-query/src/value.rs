//! Value coercion: raw query-string values to typed filter values

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value as JsonValue;

use restql_common::error::{Error, Result};

use crate::jsonb::JsonPath;
use crate::operator::{FilterOperator, OperatorKind};
use crate::params::FilterValue;

fn numeric_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").expect("numeric pattern is valid"))
}

/// Convert the raw value of a filter into its typed form for `operator`.
///
/// Compound values (spatial distance, vector thresholds) are validated here
/// but kept as text; the assembler splits them again when binding.
pub fn coerce_value(operator: FilterOperator, raw: &str) -> Result<FilterValue> {
    match operator.kind() {
        OperatorKind::Is => parse_is_value(raw),
        OperatorKind::Membership => Ok(FilterValue::List(parse_in_list(raw))),
        OperatorKind::Spatial => {
            parse_geometry(raw)?;
            Ok(FilterValue::Text(raw.to_string()))
        }
        OperatorKind::SpatialDistance => {
            parse_distance_geometry(raw)?;
            Ok(FilterValue::Text(raw.to_string()))
        }
        OperatorKind::Vector => {
            parse_vector_threshold(raw)?;
            Ok(FilterValue::Text(raw.to_string()))
        }
        OperatorKind::Binary | OperatorKind::FullText | OperatorKind::Negation => {
            Ok(FilterValue::Text(raw.to_string()))
        }
    }
}

/// `null` maps to [`FilterValue::Null`], `true`/`false` to booleans. Case-sensitive.
pub fn parse_is_value(raw: &str) -> Result<FilterValue> {
    match raw {
        "null" => Ok(FilterValue::Null),
        "true" => Ok(FilterValue::Bool(true)),
        "false" => Ok(FilterValue::Bool(false)),
        other => Err(Error::InvalidFilter(format!(
            "Invalid IS value: {other} (expected null, true or false)"
        ))),
    }
}

/// Parse an `in` list.
///
/// Accepts `a,b`, `(a,b)` and `[a,b]`; each element may be wrapped in single
/// or double quotes, which are stripped. Commas inside quotes are kept.
#[must_use]
pub fn parse_in_list(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let inner = strip_wrapping(trimmed, '(', ')')
        .or_else(|| strip_wrapping(trimmed, '[', ']'))
        .unwrap_or(trimmed);
    if inner.trim().is_empty() {
        return Vec::new();
    }

    let mut items = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in inner.chars() {
        match (quote, c) {
            (None, '\'' | '"') => {
                quote = Some(c);
                current.push(c);
            }
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (None, ',') => {
                items.push(unquote(current.trim()));
                current.clear();
            }
            _ => current.push(c),
        }
    }
    items.push(unquote(current.trim()));
    items
}

fn strip_wrapping(s: &str, open: char, close: char) -> Option<&str> {
    s.strip_prefix(open).and_then(|rest| rest.strip_suffix(close))
}

fn unquote(s: &str) -> String {
    for q in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return s[1..s.len() - 1].to_string();
        }
    }
    s.to_string()
}

/// Whether `value` is a plain ASCII decimal number
#[must_use]
pub fn is_numeric(value: &str) -> bool {
    numeric_pattern().is_match(value)
}

/// Whether the left side of a comparison needs a `::numeric` cast.
///
/// True only for text extraction (`->>`) compared against a decimal literal;
/// JSON-typed access (`->`) is compared against JSON scalars directly.
#[must_use]
pub fn needs_numeric_cast(column: &str, value: &FilterValue) -> bool {
    let Some(text) = value.as_text() else {
        return false;
    };
    JsonPath::parse(column).is_ok_and(|path| path.yields_text()) && is_numeric(text)
}

/// Validate GeoJSON text: it must parse as a JSON object
pub fn parse_geometry(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    match serde_json::from_str::<JsonValue>(trimmed) {
        Ok(JsonValue::Object(_)) => Ok(trimmed.to_string()),
        Ok(_) => Err(Error::InvalidFilter(
            "geometry must be a GeoJSON object".to_string(),
        )),
        Err(e) => Err(Error::InvalidFilter(format!("invalid GeoJSON geometry: {e}"))),
    }
}

fn parse_distance(raw: &str) -> Result<f64> {
    let distance: f64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::InvalidFilter(format!("invalid distance: {raw}")))?;
    if !distance.is_finite() || distance < 0.0 {
        return Err(Error::InvalidFilter(format!(
            "distance must be a non-negative number: {raw}"
        )));
    }
    Ok(distance)
}

/// Split `"<distance>,<GeoJSON>"` into a validated distance and geometry
pub fn parse_distance_geometry(raw: &str) -> Result<(f64, String)> {
    let (distance, geometry) = raw.split_once(',').ok_or_else(|| {
        Error::InvalidFilter(format!(
            "expected '<distance>,<GeoJSON>' but got: {raw}"
        ))
    })?;
    Ok((parse_distance(distance)?, parse_geometry(geometry)?))
}

/// Validate a bracketed numeric vector such as `[0.1,-2,3e-4]`
pub fn parse_vector_literal(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let inner = strip_wrapping(trimmed, '[', ']')
        .ok_or_else(|| Error::InvalidFilter(format!("vector must be bracketed: {raw}")))?;
    let mut parts = Vec::new();
    for part in inner.split(',') {
        let part = part.trim();
        if part.parse::<f64>().map_or(true, |v| !v.is_finite()) {
            return Err(Error::InvalidFilter(format!(
                "vector element is not a number: {part:?}"
            )));
        }
        parts.push(part);
    }
    Ok(format!("[{}]", parts.join(",")))
}

/// Split `"<max_distance>,[v1,v2,...]"` used by vector similarity filters
pub fn parse_vector_threshold(raw: &str) -> Result<(String, f64)> {
    let (threshold, vector) = raw.split_once(',').ok_or_else(|| {
        Error::InvalidFilter(format!(
            "expected '<max_distance>,[v1,v2,...]' but got: {raw}"
        ))
    })?;
    let threshold: f64 = threshold
        .trim()
        .parse()
        .ok()
        .filter(|t: &f64| t.is_finite())
        .ok_or_else(|| Error::InvalidFilter(format!("invalid vector threshold: {threshold}")))?;
    Ok((parse_vector_literal(vector)?, threshold))
}
