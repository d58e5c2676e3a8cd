//! Typed attribute values at the API boundary.
//!
//! The trailer only stores bytes. Numbers have to be encoded explicitly by
//! the caller, and the formatting rules for that are fixed here so that two
//! writers never disagree on the text of the same value.

use std::fmt;

/// A value to be stored as an attribute.
///
/// Both variants are written verbatim. `Text` exists so that callers keep
/// their intent visible and so that [`AttributeValue::as_text`] can hand the
/// string back without re-validating it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum AttributeValue {
    /// UTF-8 text (ASCII in practice).
    Text(String),
    /// Arbitrary binary content.
    Bytes(Vec<u8>),
}

impl AttributeValue {
    /// Encodes an integer as decimal ASCII (`-` sign, no grouping).
    pub fn integer(value: i64) -> Self {
        Self::Text(value.to_string())
    }

    /// Encodes a float as the shortest decimal text that round-trips.
    ///
    /// The separator is always `.`; non-finite values are written as
    /// `NaN`, `inf` and `-inf`.
    pub fn float(value: f64) -> Self {
        Self::Text(value.to_string())
    }

    /// Returns the encoded bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }

    /// Consumes the value and returns the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(text) => text.into_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }

    /// Returns the value as text if it is valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Bytes(bytes) => std::str::from_utf8(bytes).ok(),
        }
    }

    /// Returns the encoded length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns true if the value is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// Parses stored bytes written by [`AttributeValue::integer`].
pub fn parse_integer(bytes: &[u8]) -> Option<i64> {
    std::str::from_utf8(bytes).ok()?.trim().parse().ok()
}

/// Parses stored bytes written by [`AttributeValue::float`].
pub fn parse_float(bytes: &[u8]) -> Option<f64> {
    std::str::from_utf8(bytes).ok()?.trim().parse().ok()
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&[u8]> for AttributeValue {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for AttributeValue {
    fn from(value: &[u8; N]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl fmt::Debug for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Bytes(bytes) => f
                .debug_tuple("Bytes")
                .field(&String::from_utf8_lossy(bytes))
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_formatting() {
        assert_eq!(AttributeValue::integer(-42).as_bytes(), b"-42");
        assert_eq!(AttributeValue::integer(1_000_000).as_bytes(), b"1000000");
    }

    #[test]
    fn test_float_formatting_round_trips() {
        for value in [0.1, -2.5, 1e-12, 123456.789] {
            let encoded = AttributeValue::float(value);
            assert_eq!(parse_float(encoded.as_bytes()), Some(value));
        }
        assert_eq!(AttributeValue::float(f64::INFINITY).as_bytes(), b"inf");
    }

    #[test]
    fn test_bytes_are_verbatim() {
        let value = AttributeValue::from(&[0u8, 255, 7]);
        assert_eq!(value.as_bytes(), &[0, 255, 7]);
        assert_eq!(value.as_text(), None);
    }

    #[test]
    fn test_parse_integer_rejects_garbage() {
        assert_eq!(parse_integer(b"12"), Some(12));
        assert_eq!(parse_integer(b"a value"), None);
    }
}
