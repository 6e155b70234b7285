//! Error types for edit operations.

use std::fmt;

/// Result type for edit operations.
pub type EditResult<T> = Result<T, EditError>;

/// Errors that reject a single edit operation before it mutates anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// A trace index does not address an existing trace.
    TraceIndexOutOfRange { index: usize, trace_count: usize },

    /// The same trace index appears twice where indexes must be unique.
    DuplicateTraceIndex { index: usize },

    /// Parallel index lists have different lengths.
    LengthMismatch { current: usize, new: usize },

    /// A property path could not be parsed.
    InvalidPath { path: String },

    /// A trace record must be an object.
    NotAnObject { found: &'static str },
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TraceIndexOutOfRange { index, trace_count } => {
                write!(
                    f,
                    "trace index {index} out of range for {trace_count} traces"
                )
            }
            Self::DuplicateTraceIndex { index } => {
                write!(f, "duplicate trace index {index}")
            }
            Self::LengthMismatch { current, new } => {
                write!(
                    f,
                    "index list length mismatch: {current} current, {new} new"
                )
            }
            Self::InvalidPath { path } => write!(f, "invalid property path {path:?}"),
            Self::NotAnObject { found } => write!(f, "expected trace object, found {found}"),
        }
    }
}

impl std::error::Error for EditError {}
