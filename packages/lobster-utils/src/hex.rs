//! Object identifier formatting
//!
//! Heap object ids are displayed as lowercase hex with a `0x` prefix, and
//! parsed back from query strings with or without the prefix.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexError {
    #[error("empty identifier")]
    Empty,
    #[error("invalid hex identifier: {0}")]
    Invalid(String),
}

/// Format an object id as `0x1a2b`
pub fn to_hex(id: u64) -> String {
    format!("0x{:x}", id)
}

/// Parse an object id, accepting an optional `0x`/`0X` prefix
pub fn parse_hex(s: &str) -> Result<u64, HexError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if digits.is_empty() {
        return Err(HexError::Empty);
    }
    u64::from_str_radix(digits, 16).map_err(|_| HexError::Invalid(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(0), "0x0");
        assert_eq!(to_hex(0xdead_beef), "0xdeadbeef");
    }

    #[test]
    fn test_parse_hex_round_trip() {
        assert_eq!(parse_hex("0xdeadbeef").unwrap(), 0xdead_beef);
        assert_eq!(parse_hex("DEADBEEF").unwrap(), 0xdead_beef);
        assert_eq!(parse_hex(&to_hex(42)).unwrap(), 42);
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert_eq!(parse_hex(""), Err(HexError::Empty));
        assert_eq!(parse_hex("0x"), Err(HexError::Empty));
        assert!(matches!(parse_hex("zz"), Err(HexError::Invalid(_))));
    }
}
