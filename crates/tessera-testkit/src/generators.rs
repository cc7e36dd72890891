//! Proptest generators for property-based testing.

use proptest::prelude::*;

use tessera_core::{to_value, Key, Value};

/// Generate a chunk size, small enough to split most payloads.
pub fn chunk_size() -> impl Strategy<Value = usize> {
    prop_oneof![1usize..=8, 9usize..=64, Just(1024)]
}

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a field name.
pub fn field_name() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,11}".prop_map(String::from)
}

/// Generate a key-value store key.
///
/// Text keys never look numeric, so they survive key normalization as-is.
pub fn key() -> impl Strategy<Value = Key> {
    prop_oneof![
        any::<i64>().prop_map(Key::Int),
        "[a-z][a-z0-9:/-]{0,15}".prop_map(Key::Str),
    ]
}

/// Generate a scalar value. Floats are finite so values compare equal to
/// themselves.
pub fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(|n| Value::Integer(n.into())),
        (-1.0e12f64..1.0e12).prop_map(Value::Float),
        any::<bool>().prop_map(Value::Bool),
        ".{0,24}".prop_map(Value::Text),
    ]
}

/// Generate a nested value built from scalars, byte strings, lists and
/// mappings with unique text keys.
pub fn nested_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![scalar(), payload(16).prop_map(Value::Bytes)];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map(field_name(), inner, 0..6).prop_map(|map| {
                Value::Map(map.into_iter().map(|(k, v)| (Value::Text(k), v)).collect())
            }),
        ]
    })
}

/// Generate a mapping with unique text keys at the top level.
pub fn record_map() -> impl Strategy<Value = Value> {
    prop::collection::btree_map(field_name(), nested_value(), 0..8).prop_map(|map| {
        Value::Map(map.into_iter().map(|(k, v)| (Value::Text(k), v)).collect())
    })
}

/// Generate any value a store accepts.
pub fn storable_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        scalar(),
        payload(256).prop_map(Value::Bytes),
        nested_value(),
        record_map(),
    ]
}

/// Generate a JSON document and convert it through serde.
pub fn json_document() -> impl Strategy<Value = Value> {
    prop::collection::btree_map(
        field_name(),
        prop_oneof![
            any::<i32>().prop_map(serde_json::Value::from),
            any::<bool>().prop_map(serde_json::Value::from),
            "[ -~]{0,16}".prop_map(serde_json::Value::from),
            prop::collection::vec(any::<u16>(), 0..4).prop_map(serde_json::Value::from),
        ],
        0..6,
    )
    .prop_map(|fields| {
        let doc: serde_json::Map<String, serde_json::Value> = fields.into_iter().collect();
        to_value(&doc).unwrap_or(Value::Null)
    })
}

/// Parameters for reading a chunked blob.
#[derive(Debug, Clone)]
pub struct BlobParams {
    pub data: Vec<u8>,
    pub chunk_size: usize,
    /// Slice bounds, possibly negative or past either end.
    pub start: Option<i64>,
    pub stop: Option<i64>,
}

impl Arbitrary for BlobParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            payload(200),
            chunk_size(),
            any::<Option<i16>>(),
            any::<Option<i16>>(),
        )
            .prop_map(|(data, chunk_size, start, stop)| BlobParams {
                data,
                chunk_size,
                start: start.map(i64::from),
                stop: stop.map(i64::from),
            })
            .boxed()
    }
}

/// Python slice semantics over a plain buffer, the reference for blob reads.
pub fn reference_slice(data: &[u8], start: Option<i64>, stop: Option<i64>) -> Vec<u8> {
    let len = data.len() as i64;
    let clamp = |i: i64| if i < 0 { (len + i).max(0) } else { i.min(len) };
    let start = start.map_or(0, clamp);
    let stop = stop.map_or(len, clamp);
    if stop <= start {
        return Vec::new();
    }
    data[start as usize..stop as usize].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::Datatype;

    proptest! {
        #[test]
        fn test_storable_values_have_a_datatype(value in storable_value()) {
            prop_assert!(Datatype::of(&value).is_some());
        }

        #[test]
        fn test_chunk_size_positive(size in chunk_size()) {
            prop_assert!(size >= 1);
        }

        #[test]
        fn test_json_documents_are_mappings(doc in json_document()) {
            prop_assert_eq!(Datatype::of(&doc), Some(Datatype::Dict));
        }

        #[test]
        fn test_reference_slice_in_bounds(params: BlobParams) {
            let out = reference_slice(&params.data, params.start, params.stop);
            prop_assert!(out.len() <= params.data.len());
        }
    }

    #[test]
    fn test_reference_slice_examples() {
        let data = b"abcdef";
        assert_eq!(reference_slice(data, Some(1), Some(3)), b"bc");
        assert_eq!(reference_slice(data, Some(-2), None), b"ef");
        assert_eq!(reference_slice(data, None, Some(-4)), b"ab");
        assert_eq!(reference_slice(data, Some(4), Some(2)), b"");
        assert_eq!(reference_slice(data, Some(-100), Some(100)), b"abcdef");
    }
}
