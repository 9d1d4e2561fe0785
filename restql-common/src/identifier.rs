//! Identifier whitelist shared by configuration and the query compiler

/// Postgres truncates identifiers longer than this
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Whether `s` can be used as a bare SQL identifier.
///
/// Accepts `^[A-Za-z_][A-Za-z0-9_]*$` up to 63 bytes. Anything else,
/// including non-ASCII letters, is rejected.
#[must_use]
pub fn is_valid_identifier(s: &str) -> bool {
    if s.is_empty() || s.len() > MAX_IDENTIFIER_LEN {
        return false;
    }
    let mut bytes = s.bytes();
    let head_ok = bytes
        .next()
        .is_some_and(|b| b.is_ascii_alphabetic() || b == b'_');
    head_ok && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
