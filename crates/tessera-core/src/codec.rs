//! CBOR serialization of stored values.
//!
//! Values are written as definite-length CBOR:
//! - Integers use smallest valid encoding
//! - Floats are always 64-bit
//! - Map entries keep the order they have in the value
//! - Tagged values are rejected
//!
//! Entry order is preserved rather than sorted so a decoded payload compares
//! equal to the value that produced it.
//!
//! While writing a top-level map the encoder records, for each entry whose key
//! is a text string, the half-open byte range the entry's value occupies in
//! the output. [`deserialize_range`] decodes such a range on its own.

use ciborium::value::{Integer, Value};
use serde::{de::DeserializeOwned, Serialize};
use std::io::{Read, Write};

use crate::error::CoreError;
use crate::types::describe;

/// Byte range `[start, stop)` of one top-level field's value in a payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRange {
    pub field: String,
    pub start: u64,
    pub stop: u64,
}

impl FieldRange {
    pub fn len(&self) -> u64 {
        self.stop - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.stop
    }
}

/// Serialize a value into `out`, returning the field ranges of a top-level map.
///
/// Non-map values return no ranges. Entries with non-text keys are written but
/// get no range.
pub fn serialize_into<W: Write>(value: &Value, out: W) -> Result<Vec<FieldRange>, CoreError> {
    let mut encoder = Encoder::new(out);
    encoder.top_level(value)
}

/// Serialize a value to an in-memory buffer.
pub fn serialize(value: &Value) -> Result<(Vec<u8>, Vec<FieldRange>), CoreError> {
    let mut buf = Vec::new();
    let fields = serialize_into(value, &mut buf)?;
    Ok((buf, fields))
}

/// Deserialize one value from a byte stream.
///
/// The reader is consumed incrementally; bytes past the first complete item
/// are left unread.
pub fn deserialize<R: Read>(reader: R) -> Result<Value, CoreError> {
    ciborium::from_reader(reader).map_err(|e| CoreError::DecodingError(e.to_string()))
}

/// Deserialize a value from a slice holding exactly one encoded item, such as
/// the bytes addressed by a [`FieldRange`].
pub fn deserialize_range(bytes: &[u8]) -> Result<Value, CoreError> {
    if bytes.is_empty() {
        return Err(CoreError::DecodingError("empty field range".into()));
    }
    deserialize(bytes)
}

/// Convert any serializable type into a [`Value`].
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, CoreError> {
    Value::serialized(value).map_err(|e| CoreError::EncodingError(e.to_string()))
}

/// Convert a [`Value`] into a typed structure.
pub fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T, CoreError> {
    value
        .deserialized()
        .map_err(|e| CoreError::DecodingError(e.to_string()))
}

/// Position-tracking CBOR writer.
struct Encoder<W> {
    out: W,
    position: u64,
}

impl<W: Write> Encoder<W> {
    fn new(out: W) -> Self {
        Self { out, position: 0 }
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), CoreError> {
        self.out
            .write_all(bytes)
            .map_err(|e| CoreError::EncodingError(e.to_string()))?;
        self.position += bytes.len() as u64;
        Ok(())
    }

    fn top_level(&mut self, value: &Value) -> Result<Vec<FieldRange>, CoreError> {
        let entries = match value {
            Value::Map(entries) => entries,
            _ => {
                self.value(value)?;
                return Ok(Vec::new());
            }
        };

        self.uint(5, entries.len() as u64)?;
        let mut fields = Vec::with_capacity(entries.len());
        for (k, v) in entries {
            self.value(k)?;
            let start = self.position;
            self.value(v)?;
            if let Value::Text(name) = k {
                fields.push(FieldRange {
                    field: name.clone(),
                    start,
                    stop: self.position,
                });
            }
        }
        Ok(fields)
    }

    fn value(&mut self, value: &Value) -> Result<(), CoreError> {
        match value {
            Value::Integer(i) => self.integer(*i),
            Value::Bytes(b) => {
                self.uint(2, b.len() as u64)?;
                self.put(b)
            }
            Value::Text(s) => {
                self.uint(3, s.len() as u64)?;
                self.put(s.as_bytes())
            }
            Value::Array(items) => {
                self.uint(4, items.len() as u64)?;
                for item in items {
                    self.value(item)?;
                }
                Ok(())
            }
            Value::Map(entries) => {
                self.uint(5, entries.len() as u64)?;
                for (k, v) in entries {
                    self.value(k)?;
                    self.value(v)?;
                }
                Ok(())
            }
            Value::Float(f) => {
                let mut buf = [0u8; 9];
                buf[0] = 0xfb;
                buf[1..].copy_from_slice(&f.to_bits().to_be_bytes());
                self.put(&buf)
            }
            Value::Bool(b) => self.put(&[if *b { 0xf5 } else { 0xf4 }]),
            Value::Null => self.put(&[0xf6]),
            other => Err(CoreError::UnsupportedType(describe(other).into())),
        }
    }

    /// Major types 0 and 1.
    fn integer(&mut self, i: Integer) -> Result<(), CoreError> {
        let n: i128 = i.into();
        if n >= 0 {
            self.uint(0, n as u64)
        } else {
            // CBOR encodes -1 as 0, -2 as 1, etc.
            self.uint(1, (-1 - n) as u64)
        }
    }

    /// Unsigned argument in its smallest form.
    fn uint(&mut self, major: u8, n: u64) -> Result<(), CoreError> {
        let mt = major << 5;
        if n < 24 {
            self.put(&[mt | (n as u8)])
        } else if n <= 0xff {
            self.put(&[mt | 24, n as u8])
        } else if n <= 0xffff {
            let b = (n as u16).to_be_bytes();
            self.put(&[mt | 25, b[0], b[1]])
        } else if n <= 0xffff_ffff {
            let mut buf = [0u8; 5];
            buf[0] = mt | 26;
            buf[1..].copy_from_slice(&(n as u32).to_be_bytes());
            self.put(&buf)
        } else {
            let mut buf = [0u8; 9];
            buf[0] = mt | 27;
            buf[1..].copy_from_slice(&n.to_be_bytes());
            self.put(&buf)
        }
    }
}
