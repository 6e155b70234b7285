//! Error types for the sync layer.

use std::fmt;

use figure::EditError;
use wire::WireError;

use crate::protocol::DisplayId;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised by the store, display adapters and transports.
///
/// Inbound failures are per message: the loop that hit one logs it and moves
/// on to the next message.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncError {
    /// A command payload is missing a field or has the wrong shape.
    MalformedCommand { kind: &'static str, reason: String },

    /// An event payload is missing a field or has the wrong shape.
    MalformedEvent { kind: &'static str, reason: String },

    /// The edit operation rejected the command.
    Edit(EditError),

    /// The payload could not be decoded from the wire.
    Wire(WireError),

    /// No mailbox is connected for this display.
    UnknownDisplay { display: DisplayId },

    /// Adding traces would exceed the configured trace limit.
    TraceLimit { limit: usize, actual: usize },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedCommand { kind, reason } => {
                write!(f, "malformed {kind} command: {reason}")
            }
            Self::MalformedEvent { kind, reason } => {
                write!(f, "malformed {kind} event: {reason}")
            }
            Self::Edit(err) => write!(f, "edit rejected: {err}"),
            Self::Wire(err) => write!(f, "wire decode failed: {err}"),
            Self::UnknownDisplay { display } => write!(f, "unknown display {display}"),
            Self::TraceLimit { limit, actual } => {
                write!(f, "trace limit exceeded: {actual} > {limit}")
            }
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Edit(err) => Some(err),
            Self::Wire(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EditError> for SyncError {
    fn from(err: EditError) -> Self {
        Self::Edit(err)
    }
}

impl From<WireError> for SyncError {
    fn from(err: WireError) -> Self {
        Self::Wire(err)
    }
}
