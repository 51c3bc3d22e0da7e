//! Canonical CBOR encoding for deterministic signing input.
//!
//! Output follows RFC 8949 section 4.2.1: shortest integer heads, definite
//! lengths, map entries ordered by their encoded keys, and no floating
//! point (times are i64 milliseconds).
//!
//! Anything that is signed (access requests, credential bodies) goes
//! through here, so a signer and a verifier on different platforms always
//! agree on the exact bytes.

use ciborium::value::{Integer, Value};

use crate::error::CoreError;

/// Builder for a canonical map with small integer keys.
///
/// Keys 0-23 encode as single bytes. Entry insertion order does not matter;
/// the encoder sorts.
#[derive(Debug, Default, Clone)]
pub struct CanonicalMap {
    entries: Vec<(Value, Value)>,
}

impl CanonicalMap {
    /// Start an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text entry.
    pub fn text(mut self, key: u64, value: &str) -> Self {
        self.entries
            .push((Value::Integer(key.into()), Value::Text(value.to_string())));
        self
    }

    /// Add a byte-string entry.
    pub fn bytes(mut self, key: u64, value: &[u8]) -> Self {
        self.entries
            .push((Value::Integer(key.into()), Value::Bytes(value.to_vec())));
        self
    }

    /// Add an integer entry.
    pub fn int(mut self, key: u64, value: i64) -> Self {
        self.entries
            .push((Value::Integer(key.into()), Value::Integer(value.into())));
        self
    }

    /// Add an optional byte-string entry (null when absent).
    pub fn opt_bytes(mut self, key: u64, value: Option<&[u8]>) -> Self {
        let v = match value {
            Some(b) => Value::Bytes(b.to_vec()),
            None => Value::Null,
        };
        self.entries.push((Value::Integer(key.into()), v));
        self
    }

    /// Add an optional integer entry (null when absent).
    pub fn opt_int(mut self, key: u64, value: Option<i64>) -> Self {
        let v = value.map_or(Value::Null, |n| Value::Integer(n.into()));
        self.entries.push((Value::Integer(key.into()), v));
        self
    }

    /// Add an optional text entry (null when absent).
    pub fn opt_text(mut self, key: u64, value: Option<&str>) -> Self {
        let v = value.map_or(Value::Null, |s| Value::Text(s.to_string()));
        self.entries.push((Value::Integer(key.into()), v));
        self
    }

    /// Encode to canonical bytes.
    pub fn finish(self) -> Vec<u8> {
        let mut buf = Vec::new();
        // Only integers, text, bytes and null are reachable from the builder.
        encode_map_canonical(&mut buf, &self.entries);
        buf
    }
}

/// Encode an arbitrary CBOR value canonically.
///
/// Fails on floats, tags and other values with no canonical form here.
pub fn encode_canonical(value: &Value) -> Result<Vec<u8>, CoreError> {
    check_supported(value)?;
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value);
    Ok(buf)
}

fn check_supported(value: &Value) -> Result<(), CoreError> {
    match value {
        Value::Integer(_) | Value::Bytes(_) | Value::Text(_) | Value::Bool(_) | Value::Null => {
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(check_supported),
        Value::Map(entries) => entries.iter().try_for_each(|(k, v)| {
            check_supported(k)?;
            check_supported(v)
        }),
        Value::Float(_) => Err(CoreError::EncodingError(
            "floats not supported in canonical encoding".into(),
        )),
        _ => Err(CoreError::EncodingError("unsupported CBOR value type".into())),
    }
}

/// Recursively encode a CBOR value. Callers must have checked support.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => {
            encode_uint(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Value::Text(s) => {
            encode_uint(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Array(arr) => {
            encode_uint(buf, 4, arr.len() as u64);
            for item in arr {
                encode_value_to(buf, item);
            }
        }
        Value::Map(entries) => encode_map_canonical(buf, entries),
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        _ => buf.push(0xf6),
    }
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) {
    let mut pairs: Vec<(Vec<u8>, &Value)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_value_to(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value);
    }
}
