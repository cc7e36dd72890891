//! Golden test vectors for the payload format.
//!
//! Each vector pins the exact bytes a value encodes to and, for mappings,
//! where every text-keyed field lives in the payload. A change to either is
//! a format break.

use tessera_core::{decode, deserialize_range, encode, serialize, Datatype, Value};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// The value under test.
    pub value: Value,
    /// Expected datatype tag.
    pub datatype: Datatype,
    /// Expected payload bytes.
    pub encoded: &'static [u8],
    /// Expected field ranges as `(field, start, stop)`.
    pub fields: &'static [(&'static str, u64, u64)],
}

fn text(s: &str) -> Value {
    Value::Text(s.into())
}

fn int(n: i64) -> Value {
    Value::Integer(n.into())
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "small integer",
            value: int(0),
            datatype: Datatype::Int,
            encoded: &[0x00],
            fields: &[],
        },
        GoldenVector {
            name: "one-byte integer argument",
            value: int(24),
            datatype: Datatype::Int,
            encoded: &[0x18, 0x18],
            fields: &[],
        },
        GoldenVector {
            name: "two-byte integer argument",
            value: int(1000),
            datatype: Datatype::Int,
            encoded: &[0x19, 0x03, 0xe8],
            fields: &[],
        },
        GoldenVector {
            name: "negative integer",
            value: int(-500),
            datatype: Datatype::Int,
            encoded: &[0x39, 0x01, 0xf3],
            fields: &[],
        },
        GoldenVector {
            name: "text",
            value: text("hello"),
            datatype: Datatype::Str,
            encoded: b"\x65hello",
            fields: &[],
        },
        GoldenVector {
            name: "float is always double width",
            value: Value::Float(1.5),
            datatype: Datatype::Float,
            encoded: &[0xfb, 0x3f, 0xf8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
            fields: &[],
        },
        GoldenVector {
            name: "bool",
            value: Value::Bool(false),
            datatype: Datatype::Bool,
            encoded: &[0xf4],
            fields: &[],
        },
        GoldenVector {
            name: "binary is stored raw",
            value: Value::Bytes(b"raw".to_vec()),
            datatype: Datatype::Bin,
            encoded: b"raw",
            fields: &[],
        },
        GoldenVector {
            name: "nested list",
            value: Value::Array(vec![int(1), Value::Array(vec![int(2), int(3)])]),
            datatype: Datatype::List,
            encoded: &[0x82, 0x01, 0x82, 0x02, 0x03],
            fields: &[],
        },
        GoldenVector {
            name: "mapping with two fields",
            value: Value::Map(vec![(text("id"), int(42)), (text("name"), text("alex"))]),
            datatype: Datatype::Dict,
            encoded: &[
                0xa2, 0x62, b'i', b'd', 0x18, 0x2a, 0x64, b'n', b'a', b'm', b'e', 0x64, b'a',
                b'l', b'e', b'x',
            ],
            fields: &[("id", 4, 6), ("name", 11, 16)],
        },
        GoldenVector {
            name: "mapping with a non-text key",
            value: Value::Map(vec![(int(1), text("a")), (text("k"), Value::Bool(true))]),
            datatype: Datatype::Dict,
            encoded: &[0xa2, 0x01, 0x61, b'a', 0x61, b'k', 0xf5],
            fields: &[("k", 6, 7)],
        },
        GoldenVector {
            name: "empty mapping",
            value: Value::Map(Vec::new()),
            datatype: Datatype::Dict,
            encoded: &[0xa0],
            fields: &[],
        },
    ]
}

/// Check one vector against the codec.
///
/// Encodes with several chunk sizes and checks that the chunks concatenate
/// to the expected bytes, decode back to the value, and that every field
/// range decodes on its own to the field's value.
pub fn verify_vector(vector: &GoldenVector) -> Result<(), String> {
    let fail = |what: String| format!("{}: {}", vector.name, what);

    for chunk_size in [1, 2, 3, 7, 1024] {
        let (encoded, chunks) =
            encode(&vector.value, chunk_size).map_err(|e| fail(e.to_string()))?;
        if encoded.datatype != vector.datatype {
            return Err(fail(format!("datatype {:?}", encoded.datatype)));
        }
        let joined: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
        if joined != vector.encoded {
            return Err(fail(format!("bytes {:02x?} at chunk size {}", joined, chunk_size)));
        }
        if chunks.iter().any(|c| c.len() > chunk_size) {
            return Err(fail(format!("oversized chunk at chunk size {}", chunk_size)));
        }
        let back = decode(&chunks, encoded.datatype).map_err(|e| fail(e.to_string()))?;
        if back != vector.value {
            return Err(fail(format!("decoded {:?}", back)));
        }
        let fields: Vec<(&str, u64, u64)> = encoded
            .fields
            .iter()
            .map(|f| (f.field.as_str(), f.start, f.stop))
            .collect();
        if fields != vector.fields {
            return Err(fail(format!("fields {:?}", fields)));
        }
    }

    if let Value::Map(entries) = &vector.value {
        let (bytes, _) = serialize(&vector.value).map_err(|e| fail(e.to_string()))?;
        for &(name, start, stop) in vector.fields {
            let expected = entries
                .iter()
                .find(|(k, _)| matches!(k, Value::Text(t) if t == name))
                .map(|(_, v)| v)
                .ok_or_else(|| fail(format!("no entry for {}", name)))?;
            let got = deserialize_range(&bytes[start as usize..stop as usize])
                .map_err(|e| fail(e.to_string()))?;
            if &got != expected {
                return Err(fail(format!("field {} decoded to {:?}", name, got)));
            }
        }
    }
    Ok(())
}

/// Verify every golden vector, stopping at the first mismatch.
pub fn verify_all_vectors() -> Result<(), String> {
    all_vectors().iter().try_for_each(verify_vector)
}
