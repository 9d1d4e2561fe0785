//! Identifier validation and quoting
//!
//! Identifiers are spliced into SQL only after passing a whitelist check, so
//! quoting never needs to escape anything: a name that would need escaping is
//! rejected instead.

use restql_common::error::{Error, Result};
pub use restql_common::identifier::{is_valid_identifier, MAX_IDENTIFIER_LEN};

/// Keywords the DDL path refuses as table or column names
const RESERVED_KEYWORDS: &[&str] = &[
    "all", "alter", "and", "as", "asc", "between", "by", "case", "check", "column",
    "constraint", "create", "cross", "default", "delete", "desc", "distinct", "drop", "else",
    "end", "exists", "false", "foreign", "from", "full", "grant", "group", "having", "in",
    "index", "inner", "insert", "into", "is", "join", "key", "left", "like", "limit", "not",
    "null", "offset", "on", "or", "order", "outer", "primary", "references", "revoke",
    "right", "select", "set", "table", "then", "true", "union", "unique", "update", "user",
    "using", "values", "when", "where", "with",
];

/// Double-quote `s`, or return an empty string if it is not a valid identifier
#[must_use]
pub fn quote_identifier(s: &str) -> String {
    if is_valid_identifier(s) {
        format!("\"{s}\"")
    } else {
        String::new()
    }
}

/// Quote an identifier, failing with a descriptive error when it is rejected
pub fn require_identifier(s: &str) -> Result<String> {
    let quoted = quote_identifier(s);
    if quoted.is_empty() {
        Err(Error::InvalidIdentifier(format!("'{s}' is not a valid identifier")))
    } else {
        Ok(quoted)
    }
}

/// Quote a possibly qualified column such as `user.profile.name`.
///
/// Every dot-separated part must be a valid identifier. `*` passes through.
pub fn quote_column(column: &str) -> Result<String> {
    if column == "*" {
        return Ok("*".to_string());
    }
    let parts = column
        .split('.')
        .map(require_identifier)
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join("."))
}

/// Validate a name used in DDL (CREATE TABLE, ADD COLUMN, ...).
///
/// Stricter than [`is_valid_identifier`]: lowercase reserved keywords are
/// refused, and each failure carries its own reason.
///
/// # Errors
/// Returns `InvalidIdentifier` describing why the name was rejected.
pub fn validate_ddl_identifier(name: &str) -> Result<()> {
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(Error::InvalidIdentifier(format!(
            "identifier '{name}' cannot exceed {MAX_IDENTIFIER_LEN} characters"
        )));
    }
    if !is_valid_identifier(name) {
        return Err(Error::InvalidIdentifier(format!(
            "identifier '{name}' must start with a letter or underscore and contain only letters, digits, and underscores"
        )));
    }
    if RESERVED_KEYWORDS.contains(&name) {
        return Err(Error::InvalidIdentifier(format!(
            "identifier '{name}' is a reserved keyword"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rejected_identifiers() {
        for bad in ["1column", "col-name", "col;drop table", "", " ", "naïve", "a b", "\"x\""] {
            assert!(!is_valid_identifier(bad), "{bad:?} should be rejected");
            assert_eq!(quote_identifier(bad), "");
        }
    }

    #[test]
    fn test_accepted_identifiers() {
        let max = "a".repeat(63);
        for good in ["_", "a", "user_id", "Col9", max.as_str()] {
            assert!(is_valid_identifier(good), "{good:?} should be accepted");
        }
        assert!(!is_valid_identifier(&"a".repeat(64)));
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("status"), "\"status\"");
        assert_eq!(quote_identifier("status\""), "");
    }

    #[test]
    fn test_quote_column_qualified() {
        assert_eq!(
            quote_column("user.profile.name").unwrap(),
            "\"user\".\"profile\".\"name\""
        );
        assert_eq!(quote_column("*").unwrap(), "*");
        assert!(quote_column("user..name").is_err());
        assert!(quote_column("user.1x").is_err());
    }

    #[test]
    fn test_ddl_identifier_messages() {
        let err = validate_ddl_identifier("1abc").unwrap_err().to_string();
        assert!(err.contains("must start with a letter"));

        let err = validate_ddl_identifier(&"x".repeat(64)).unwrap_err().to_string();
        assert!(err.contains("cannot exceed 63"));

        let err = validate_ddl_identifier("select").unwrap_err().to_string();
        assert!(err.contains("is a reserved keyword"));

        assert!(validate_ddl_identifier("user").is_err());
        assert!(validate_ddl_identifier("User").is_ok());
        assert!(validate_ddl_identifier("users").is_ok());
    }

    proptest! {
        #[test]
        fn prop_valid_identifiers_quote_verbatim(s in "[A-Za-z_][A-Za-z0-9_]{0,62}") {
            prop_assert!(is_valid_identifier(&s));
            prop_assert_eq!(quote_identifier(&s), format!("\"{}\"", s));
        }

        #[test]
        fn prop_rejected_identifiers_quote_empty(s in "\\PC*") {
            if !is_valid_identifier(&s) {
                prop_assert_eq!(quote_identifier(&s), "");
            } else {
                prop_assert!(quote_identifier(&s).contains(&s));
            }
        }

        #[test]
        fn prop_leading_digit_rejected(s in "[0-9][A-Za-z0-9_]{0,20}") {
            prop_assert!(!is_valid_identifier(&s));
        }
    }
}
