//! Tagged cache values and the wire codec.
//!
//! Values cross the wire in one of two shapes: integers travel as their
//! plain decimal text so the backend's native increment/decrement keep
//! working on them, and everything else travels as a bincode blob. Decoding
//! inverts this by sniffing the payload: an all-digit payload is read back
//! as an integer, anything else as a blob.
//!
//! Known ambiguity, inherited deliberately: a serialized blob whose encoded
//! bytes happen to be all-digit text will decode as an integer. Callers that
//! store values with such encodings must not rely on the round-trip law.

use crate::error::{CacheError, Result};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A cache value at the codec boundary: a native integer or an opaque
/// serialized blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Integer fast path, stored unserialized on the backend
    Integer(i64),
    /// bincode-serialized payload
    Blob(Bytes),
}

impl Value {
    /// Serialize an arbitrary value into a blob.
    pub fn encode<T: Serialize>(value: &T) -> Result<Value> {
        let bytes = bincode::serialize(value)
            .map_err(|e| CacheError::Serialization(format!("encode failed: {}", e)))?;
        Ok(Value::Blob(Bytes::from(bytes)))
    }

    /// Deserialize a blob back into a concrete type.
    ///
    /// Fails with [`CacheError::Serialization`] on malformed payloads or
    /// when called on an integer value.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        match self {
            Value::Integer(n) => Err(CacheError::Serialization(format!(
                "value is a native integer ({}), not a serialized object",
                n
            ))),
            Value::Blob(bytes) => bincode::deserialize(bytes)
                .map_err(|e| CacheError::Serialization(format!("decode failed: {}", e))),
        }
    }

    /// Integer accessor
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Blob(_) => None,
        }
    }

    /// Encode into the byte form sent to a backend node.
    pub(crate) fn to_wire(&self) -> Bytes {
        match self {
            Value::Integer(n) => Bytes::from(n.to_string()),
            Value::Blob(bytes) => bytes.clone(),
        }
    }

    /// Decode a raw payload received from a backend node.
    ///
    /// A non-empty all-digit payload is an integer; everything else is a
    /// blob. Payloads too large for `i64` fall back to blob.
    pub(crate) fn from_wire(raw: Bytes) -> Value {
        if !raw.is_empty() && raw.iter().all(|b| b.is_ascii_digit()) {
            // UTF-8 by construction, all bytes are ASCII digits
            if let Ok(n) = std::str::from_utf8(&raw).unwrap_or("").parse() {
                return Value::Integer(n);
            }
        }
        Value::Blob(raw)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n as i64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(n as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_passes_through_unserialized() {
        let value = Value::from(42);
        assert_eq!(value.to_wire(), Bytes::from("42"));
        assert_eq!(Value::from_wire(Bytes::from("42")), Value::Integer(42));
    }

    #[test]
    fn test_blob_round_trip() {
        let original = vec!["alpha".to_string(), "beta".to_string()];
        let encoded = Value::encode(&original).unwrap();
        let wire = encoded.to_wire();
        let decoded = Value::from_wire(wire);
        let restored: Vec<String> = decoded.deserialize().unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_from_wire_empty_is_blob() {
        assert_eq!(
            Value::from_wire(Bytes::new()),
            Value::Blob(Bytes::new())
        );
    }

    #[test]
    fn test_from_wire_mixed_digits_is_blob() {
        let raw = Bytes::from("12a3");
        assert_eq!(Value::from_wire(raw.clone()), Value::Blob(raw));
    }

    #[test]
    fn test_from_wire_overflowing_digits_falls_back_to_blob() {
        let raw = Bytes::from("99999999999999999999999999");
        assert_eq!(Value::from_wire(raw.clone()), Value::Blob(raw));
    }

    #[test]
    fn test_all_digit_blob_misreads_as_integer() {
        // The documented ambiguity: a blob whose bytes are all digits
        // decodes as an integer, not the original blob.
        let raw = Bytes::from("123");
        let decoded = Value::from_wire(raw);
        assert_eq!(decoded, Value::Integer(123));
    }

    #[test]
    fn test_deserialize_integer_fails() {
        let value = Value::Integer(7);
        assert!(matches!(
            value.deserialize::<String>(),
            Err(CacheError::Serialization(_))
        ));
    }

    #[test]
    fn test_deserialize_malformed_blob_fails() {
        let value = Value::Blob(Bytes::from_static(b"\xff\xfe"));
        assert!(value.deserialize::<Vec<String>>().is_err());
    }
}
