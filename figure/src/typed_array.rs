//! Bulk numeric arrays with a fixed element type.

use std::fmt;

use crate::Value;

/// Element type of a [`TypedArray`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Int8,
    Int16,
    Int32,
    Uint8,
    Uint16,
    Uint32,
    Float32,
    Float64,
}

impl DType {
    /// All supported element types.
    pub const ALL: [Self; 8] = [
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Uint8,
        Self::Uint16,
        Self::Uint32,
        Self::Float32,
        Self::Float64,
    ];

    /// Returns the wire name (`"int8"`, `"float64"`, ...).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Parses a wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|dtype| dtype.name() == name)
    }

    /// Size of one element in bytes.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A homogeneous numeric buffer.
///
/// Typed arrays are leaves: edit operations broadcast them as constants and
/// the delta engine copies them wholesale instead of diffing elements.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedArray {
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Uint8(Vec<u8>),
    Uint16(Vec<u16>),
    Uint32(Vec<u32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

macro_rules! each_variant {
    ($array:expr, $items:ident => $body:expr) => {
        match $array {
            TypedArray::Int8($items) => $body,
            TypedArray::Int16($items) => $body,
            TypedArray::Int32($items) => $body,
            TypedArray::Uint8($items) => $body,
            TypedArray::Uint16($items) => $body,
            TypedArray::Uint32($items) => $body,
            TypedArray::Float32($items) => $body,
            TypedArray::Float64($items) => $body,
        }
    };
}

impl TypedArray {
    /// Returns the element type.
    #[must_use]
    pub const fn dtype(&self) -> DType {
        match self {
            Self::Int8(_) => DType::Int8,
            Self::Int16(_) => DType::Int16,
            Self::Int32(_) => DType::Int32,
            Self::Uint8(_) => DType::Uint8,
            Self::Uint16(_) => DType::Uint16,
            Self::Uint32(_) => DType::Uint32,
            Self::Float32(_) => DType::Float32,
            Self::Float64(_) => DType::Float64,
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        each_variant!(self, items => items.len())
    }

    /// Returns `true` if the array has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns element `index` widened to `f64`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<f64> {
        each_variant!(self, items => items.get(index).map(|v| f64::from(*v)))
    }

    /// Overwrites element `index`, casting `value` to the element type.
    ///
    /// Returns `false` if `index` is out of bounds.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "assignment into a typed buffer saturates like the engine's own buffers"
    )]
    pub fn set(&mut self, index: usize, value: f64) -> bool {
        match self {
            Self::Int8(items) => write_slot(items, index, value as i8),
            Self::Int16(items) => write_slot(items, index, value as i16),
            Self::Int32(items) => write_slot(items, index, value as i32),
            Self::Uint8(items) => write_slot(items, index, value as u8),
            Self::Uint16(items) => write_slot(items, index, value as u16),
            Self::Uint32(items) => write_slot(items, index, value as u32),
            Self::Float32(items) => write_slot(items, index, value as f32),
            Self::Float64(items) => write_slot(items, index, value),
        }
    }

    /// Expands the buffer into plain number values.
    #[must_use]
    pub fn to_values(&self) -> Vec<Value> {
        each_variant!(self, items => items.iter().map(|v| Value::Number(f64::from(*v))).collect())
    }

    /// Raw little-endian bytes of the buffer.
    #[must_use]
    pub fn to_le_bytes(&self) -> Vec<u8> {
        each_variant!(self, items => items.iter().flat_map(|v| v.to_le_bytes()).collect())
    }

    /// Rebuilds a buffer from little-endian bytes.
    ///
    /// Returns `None` if `bytes` is not a whole number of elements.
    #[must_use]
    pub fn from_le_bytes(dtype: DType, bytes: &[u8]) -> Option<Self> {
        if bytes.len() % dtype.size() != 0 {
            return None;
        }
        Some(match dtype {
            DType::Int8 => Self::Int8(read_chunks(bytes, i8::from_le_bytes)),
            DType::Int16 => Self::Int16(read_chunks(bytes, i16::from_le_bytes)),
            DType::Int32 => Self::Int32(read_chunks(bytes, i32::from_le_bytes)),
            DType::Uint8 => Self::Uint8(bytes.to_vec()),
            DType::Uint16 => Self::Uint16(read_chunks(bytes, u16::from_le_bytes)),
            DType::Uint32 => Self::Uint32(read_chunks(bytes, u32::from_le_bytes)),
            DType::Float32 => Self::Float32(read_chunks(bytes, f32::from_le_bytes)),
            DType::Float64 => Self::Float64(read_chunks(bytes, f64::from_le_bytes)),
        })
    }
}

fn write_slot<T>(items: &mut [T], index: usize, value: T) -> bool {
    match items.get_mut(index) {
        Some(slot) => {
            *slot = value;
            true
        }
        None => false,
    }
}

fn read_chunks<const N: usize, T>(bytes: &[u8], decode: fn([u8; N]) -> T) -> Vec<T> {
    bytes
        .chunks_exact(N)
        .map(|chunk| {
            let mut buf = [0u8; N];
            buf.copy_from_slice(chunk);
            decode(buf)
        })
        .collect()
}
