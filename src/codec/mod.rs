//! Composite key encoding.
//!
//! A relational primary key is a tuple of typed fields; the store only accepts
//! a single string key. Fields are rendered to strings and joined with
//! [`SEPARATOR`]. Integer fields that take part in range scans are zero-padded
//! to a fixed width so that lexicographic key order matches numeric order.

use crate::core::{DriverError, Result};
use std::fmt;

pub const SEPARATOR: char = ':';

/// One typed component of a composite key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyField {
    Int(i64),
    /// Non-negative integer rendered with exactly `width` digits.
    Padded { value: i64, width: usize },
    Text(String),
}

impl KeyField {
    pub fn int(value: i64) -> Self {
        Self::Int(value)
    }

    pub fn padded(value: i64, width: usize) -> Self {
        Self::Padded { value, width }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Int(_) => FieldKind::Int,
            Self::Padded { width, .. } => FieldKind::Padded(*width),
            Self::Text(_) => FieldKind::Text,
        }
    }

    fn render(&self) -> Result<String> {
        match self {
            Self::Int(v) => Ok(v.to_string()),
            Self::Padded { value, width } => {
                if *value < 0 {
                    return Err(DriverError::Encoding(format!(
                        "padded key field must be non-negative, got {}",
                        value
                    )));
                }
                let rendered = format!("{:0width$}", value, width = *width);
                if rendered.len() > *width {
                    return Err(DriverError::Encoding(format!(
                        "key field {} does not fit in {} digits",
                        value, width
                    )));
                }
                Ok(rendered)
            }
            Self::Text(s) => {
                if s.contains(SEPARATOR) {
                    return Err(DriverError::Encoding(format!(
                        "key field '{}' contains the separator '{}'",
                        s, SEPARATOR
                    )));
                }
                Ok(s.clone())
            }
        }
    }
}

impl fmt::Display for KeyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Padded { value, width } => write!(f, "{:0width$}", value, width = *width),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Shape of a key field, used to decode a key back into typed fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Int,
    Padded(usize),
    Text,
}

pub struct KeyCodec;

impl KeyCodec {
    pub fn encode(fields: &[KeyField]) -> Result<String> {
        if fields.is_empty() {
            return Err(DriverError::Encoding("cannot encode an empty key".to_string()));
        }
        let mut key = String::new();
        for (idx, field) in fields.iter().enumerate() {
            if idx > 0 {
                key.push(SEPARATOR);
            }
            key.push_str(&field.render()?);
        }
        Ok(key)
    }

    /// Encodes a leading subset of a key's fields for prefix scans.
    ///
    /// The trailing separator keeps `1:2:` from matching keys that start `1:20:`.
    /// An empty field list yields the empty prefix, which matches every key.
    pub fn encode_prefix(fields: &[KeyField]) -> Result<String> {
        if fields.is_empty() {
            return Ok(String::new());
        }
        let mut prefix = Self::encode(fields)?;
        prefix.push(SEPARATOR);
        Ok(prefix)
    }

    pub fn decode(key: &str) -> Vec<String> {
        key.split(SEPARATOR).map(str::to_string).collect()
    }

    pub fn decode_fields(key: &str, kinds: &[FieldKind]) -> Result<Vec<KeyField>> {
        let parts = Self::decode(key);
        if parts.len() != kinds.len() {
            return Err(DriverError::Encoding(format!(
                "key '{}' has {} fields, expected {}",
                key,
                parts.len(),
                kinds.len()
            )));
        }
        parts
            .into_iter()
            .zip(kinds)
            .map(|(part, kind)| match kind {
                FieldKind::Text => Ok(KeyField::Text(part)),
                FieldKind::Int => parse_int(&part, key).map(KeyField::Int),
                FieldKind::Padded(width) => {
                    if part.len() != *width {
                        return Err(DriverError::Encoding(format!(
                            "field '{}' in key '{}' is not {} digits wide",
                            part, key, width
                        )));
                    }
                    parse_int(&part, key).map(|value| KeyField::Padded {
                        value,
                        width: *width,
                    })
                }
            })
            .collect()
    }
}

fn parse_int(part: &str, key: &str) -> Result<i64> {
    part.parse::<i64>().map_err(|_| {
        DriverError::Encoding(format!(
            "field '{}' in key '{}' is not an integer",
            part, key
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_joins_fields() {
        let key = KeyCodec::encode(&[KeyField::int(7), KeyField::text("abc"), KeyField::padded(3, 4)])
            .unwrap();
        assert_eq!(key, "7:abc:0003");
        assert_eq!(KeyCodec::decode(&key), vec!["7", "abc", "0003"]);
    }

    #[test]
    fn test_separator_in_text_is_rejected() {
        let err = KeyCodec::encode(&[KeyField::text("a:b")]).unwrap_err();
        assert!(matches!(err, DriverError::Encoding(_)));
    }

    #[test]
    fn test_padded_overflow_and_negative_are_rejected() {
        assert!(KeyCodec::encode(&[KeyField::padded(12345, 4)]).is_err());
        assert!(KeyCodec::encode(&[KeyField::padded(-1, 4)]).is_err());
    }

    #[test]
    fn test_prefix_does_not_match_longer_numbers() {
        let prefix = KeyCodec::encode_prefix(&[KeyField::int(1), KeyField::int(2)]).unwrap();
        let other = KeyCodec::encode(&[KeyField::int(1), KeyField::int(20), KeyField::int(5)]).unwrap();
        let own = KeyCodec::encode(&[KeyField::int(1), KeyField::int(2), KeyField::int(5)]).unwrap();
        assert!(!other.starts_with(&prefix));
        assert!(own.starts_with(&prefix));
    }

    #[test]
    fn test_decode_fields_checks_arity_and_width() {
        let kinds = [FieldKind::Int, FieldKind::Padded(3)];
        assert!(KeyCodec::decode_fields("1:02", &kinds).is_err());
        assert!(KeyCodec::decode_fields("1", &kinds).is_err());
        assert_eq!(
            KeyCodec::decode_fields("1:002", &kinds).unwrap(),
            vec![KeyField::int(1), KeyField::padded(2, 3)]
        );
    }
}
