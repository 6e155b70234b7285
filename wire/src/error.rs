//! Error types for wire codec operations.

use std::fmt;

/// Result type for wire codec operations.
pub type WireResult<T> = Result<T, WireError>;

/// Errors raised while decoding wire values.
///
/// Buffer errors fail only the value that carried them; `LimitsExceeded`
/// for depth fails the whole decode.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WireError {
    /// `dtype` names no supported element type.
    UnsupportedDType { dtype: String },

    /// `shape` is missing, malformed or disagrees with the byte count.
    InvalidShape { expected: usize, actual: usize },

    /// Byte count is not a whole number of elements.
    BufferLength { dtype: &'static str, bytes: usize },

    /// Neither `value` nor `buffer` carries bytes.
    MissingBuffer,

    /// Limits exceeded.
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },
}

/// Specific decode limit that was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Depth,
    BufferBytes,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedDType { dtype } => write!(f, "unsupported dtype {dtype:?}"),
            Self::InvalidShape { expected, actual } => {
                write!(
                    f,
                    "shape mismatch: shape holds {expected} elements, buffer {actual}"
                )
            }
            Self::BufferLength { dtype, bytes } => {
                write!(f, "{bytes} bytes is not a whole number of {dtype} elements")
            }
            Self::MissingBuffer => write!(f, "buffer object carries no bytes"),
            Self::LimitsExceeded {
                kind,
                limit,
                actual,
            } => {
                write!(f, "{kind} limit exceeded: {actual} > {limit}")
            }
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Depth => "nesting depth",
            Self::BufferBytes => "buffer bytes",
        };
        write!(f, "{name}")
    }
}

impl std::error::Error for WireError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unsupported_dtype() {
        let err = WireError::UnsupportedDType {
            dtype: "complex128".into(),
        };
        assert!(err.to_string().contains("complex128"));
    }

    #[test]
    fn display_limits_exceeded() {
        let err = WireError::LimitsExceeded {
            kind: LimitKind::Depth,
            limit: 4,
            actual: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("nesting depth"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn display_buffer_length() {
        let err = WireError::BufferLength {
            dtype: "int32",
            bytes: 7,
        };
        let msg = err.to_string();
        assert!(msg.contains("int32"));
        assert!(msg.contains('7'));
    }
}
