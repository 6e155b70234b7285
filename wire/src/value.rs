//! Values as the transport carries them.

use std::collections::BTreeMap;

use serde::Serialize;

/// A transport-level value.
///
/// The transport has no representation for "absent"; the codec stands in a
/// sentinel string for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// Raw binary payload.
    Bytes(Vec<u8>),
    List(Vec<WireValue>),
    Map(BTreeMap<String, WireValue>),
}

impl WireValue {
    /// Looks up `key` if this value is a map.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// Total bytes carried in [`WireValue::Bytes`] payloads.
    #[must_use]
    pub fn byte_payload_len(&self) -> usize {
        match self {
            Self::Bytes(bytes) => bytes.len(),
            Self::List(items) => items.iter().map(Self::byte_payload_len).sum(),
            Self::Map(map) => map.values().map(Self::byte_payload_len).sum(),
            _ => 0,
        }
    }
}

impl From<serde_json::Value> for WireValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_bytes_as_number_list() {
        let mut map = BTreeMap::new();
        map.insert("value".to_owned(), WireValue::Bytes(vec![1, 2]));
        let json = serde_json::to_value(WireValue::Map(map)).unwrap();
        assert_eq!(json, json!({"value": [1, 2]}));
    }

    #[test]
    fn byte_payload_len_counts_nested() {
        let value = WireValue::List(vec![
            WireValue::Bytes(vec![0; 3]),
            WireValue::from(json!({"a": 1})),
            WireValue::Bytes(vec![0; 5]),
        ]);
        assert_eq!(value.byte_payload_len(), 8);
    }
}
