//! Value <-> wire conversion.

use std::collections::BTreeMap;

use figure::{DType, TypedArray, Value};
use tracing::warn;

use crate::error::{LimitKind, WireError, WireResult};
use crate::limits::Limits;
use crate::value::WireValue;

/// Wire stand-in for an absent value.
///
/// A genuine string equal to the sentinel decodes as absent; nothing in the
/// format distinguishes the two.
pub const UNDEFINED_SENTINEL: &str = "_undefined_";

/// Encodes a value for the transport.
///
/// Typed arrays become `{dtype, shape: [len], value: bytes}` objects.
/// `Undefined` and functions become [`UNDEFINED_SENTINEL`].
#[must_use]
pub fn encode(value: &Value) -> WireValue {
    match value {
        Value::Undefined | Value::Function(_) => WireValue::String(UNDEFINED_SENTINEL.to_owned()),
        Value::Null => WireValue::Null,
        Value::Bool(b) => WireValue::Bool(*b),
        Value::Number(n) => WireValue::Number(*n),
        Value::String(s) => WireValue::String(s.clone()),
        Value::Array(items) => WireValue::List(items.iter().map(encode).collect()),
        Value::Object(map) => WireValue::Map(
            map.iter()
                .map(|(key, value)| (key.clone(), encode(value)))
                .collect(),
        ),
        Value::Typed(array) => encode_buffer(array),
    }
}

/// Encodes one typed array as a buffer object.
#[must_use]
pub fn encode_buffer(array: &TypedArray) -> WireValue {
    let mut map = BTreeMap::new();
    map.insert(
        "dtype".to_owned(),
        WireValue::String(array.dtype().name().to_owned()),
    );
    #[allow(
        clippy::cast_precision_loss,
        reason = "buffer lengths stay far below 2^53"
    )]
    let len = array.len() as f64;
    map.insert("shape".to_owned(), WireValue::List(vec![WireValue::Number(len)]));
    map.insert("value".to_owned(), WireValue::Bytes(array.to_le_bytes()));
    WireValue::Map(map)
}

/// Decodes a wire value.
///
/// Buffer objects are rebuilt into typed arrays. A buffer that fails to
/// decode is logged and left opaque: its map is decoded structurally, with
/// raw bytes as a `uint8` array. Only nesting beyond `limits.max_depth`
/// fails the whole decode.
pub fn decode(wire: &WireValue, limits: &Limits) -> WireResult<Value> {
    decode_at(wire, limits, 0)
}

fn decode_at(wire: &WireValue, limits: &Limits, depth: usize) -> WireResult<Value> {
    if depth > limits.max_depth {
        return Err(WireError::LimitsExceeded {
            kind: LimitKind::Depth,
            limit: limits.max_depth,
            actual: depth,
        });
    }
    Ok(match wire {
        WireValue::Null => Value::Null,
        WireValue::Bool(b) => Value::Bool(*b),
        WireValue::Number(n) => Value::Number(*n),
        WireValue::String(s) if s == UNDEFINED_SENTINEL => Value::Undefined,
        WireValue::String(s) => Value::String(s.clone()),
        WireValue::Bytes(bytes) => Value::Typed(TypedArray::Uint8(bytes.clone())),
        WireValue::List(items) => Value::Array(
            items
                .iter()
                .map(|item| decode_at(item, limits, depth + 1))
                .collect::<WireResult<_>>()?,
        ),
        WireValue::Map(map) if is_buffer_object(map) => match decode_buffer(map, limits) {
            Ok(array) => Value::Typed(array),
            Err(err) => {
                warn!(error = %err, "leaving undecodable buffer opaque");
                decode_map(map, limits, depth)?
            }
        },
        WireValue::Map(map) => decode_map(map, limits, depth)?,
    })
}

fn decode_map(
    map: &BTreeMap<String, WireValue>,
    limits: &Limits,
    depth: usize,
) -> WireResult<Value> {
    Ok(Value::Object(
        map.iter()
            .map(|(key, value)| Ok((key.clone(), decode_at(value, limits, depth + 1)?)))
            .collect::<WireResult<_>>()?,
    ))
}

/// Returns `true` if `map` has the shape of a buffer object.
#[must_use]
pub fn is_buffer_object(map: &BTreeMap<String, WireValue>) -> bool {
    map.contains_key("dtype")
        && map.contains_key("shape")
        && (map.contains_key("value") || map.contains_key("buffer"))
}

/// Strictly decodes one buffer object.
///
/// Bytes are read from `value`, falling back to the legacy `buffer` key, and
/// may arrive as raw bytes or as a list of byte-valued numbers.
pub fn decode_buffer(map: &BTreeMap<String, WireValue>, limits: &Limits) -> WireResult<TypedArray> {
    let dtype_name = match map.get("dtype") {
        Some(WireValue::String(name)) => name.as_str(),
        _ => "",
    };
    let dtype = DType::from_name(dtype_name).ok_or_else(|| WireError::UnsupportedDType {
        dtype: dtype_name.to_owned(),
    })?;

    let bytes = map
        .get("value")
        .or_else(|| map.get("buffer"))
        .and_then(buffer_bytes)
        .ok_or(WireError::MissingBuffer)?;
    if bytes.len() > limits.max_buffer_bytes {
        return Err(WireError::LimitsExceeded {
            kind: LimitKind::BufferBytes,
            limit: limits.max_buffer_bytes,
            actual: bytes.len(),
        });
    }

    let array = TypedArray::from_le_bytes(dtype, &bytes).ok_or(WireError::BufferLength {
        dtype: dtype.name(),
        bytes: bytes.len(),
    })?;

    let expected = shape_len(map.get("shape")).ok_or(WireError::InvalidShape {
        expected: 0,
        actual: array.len(),
    })?;
    if expected != array.len() {
        return Err(WireError::InvalidShape {
            expected,
            actual: array.len(),
        });
    }
    Ok(array)
}

fn buffer_bytes(wire: &WireValue) -> Option<Vec<u8>> {
    match wire {
        WireValue::Bytes(bytes) => Some(bytes.clone()),
        WireValue::List(items) => items.iter().map(byte_value).collect(),
        _ => None,
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "range and integrality are checked first"
)]
fn byte_value(wire: &WireValue) -> Option<u8> {
    match wire {
        WireValue::Number(n) if n.fract() == 0.0 && (0.0..=255.0).contains(n) => Some(*n as u8),
        _ => None,
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "range and integrality are checked first"
)]
fn shape_len(shape: Option<&WireValue>) -> Option<usize> {
    let Some(WireValue::List(dims)) = shape else {
        return None;
    };
    dims.iter().try_fold(1usize, |acc, dim| match dim {
        WireValue::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= f64::from(u32::MAX) => {
            acc.checked_mul(*n as usize)
        }
        _ => None,
    })
}
