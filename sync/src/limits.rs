//! Limits for host and display bookkeeping.

/// Bounds on what a store or display adapter will accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncLimits {
    /// Maximum replies a display adapter keeps waiting for its engine.
    pub max_pending_replies: usize,
    /// Maximum traces a figure may hold after an add.
    pub max_traces: usize,
}

impl Default for SyncLimits {
    fn default() -> Self {
        Self {
            max_pending_replies: 256,
            max_traces: 10_000,
        }
    }
}

impl SyncLimits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_pending_replies: 4,
            max_traces: 16,
        }
    }

    /// Creates limits with no restrictions (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_pending_replies: usize::MAX,
            max_traces: usize::MAX,
        }
    }
}
