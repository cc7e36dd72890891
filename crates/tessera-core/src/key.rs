//! Key normalization for the key-value store.
//!
//! A text key made only of ASCII digits is treated as the integer it spells,
//! so `"007"` and `7` name the same record. Normalization runs once, where a
//! key enters the store.

use crate::error::ValidationError;
use crate::types::Key;

/// Normalize a key.
///
/// With `coerce_numeric` set, a non-empty all-ASCII-digit text key becomes
/// [`Key::Int`]. Signs, whitespace and non-ASCII digits leave the key as
/// text. A digit string too large for `i64` is rejected.
pub fn normalize_key(key: Key, coerce_numeric: bool) -> Result<Key, ValidationError> {
    match key {
        Key::Str(s) if coerce_numeric && is_ascii_numeric(&s) => s
            .parse::<i64>()
            .map(Key::Int)
            .map_err(|_| ValidationError::MalformedKey(format!("integer key out of range: {}", s))),
        other => Ok(other),
    }
}

fn is_ascii_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
