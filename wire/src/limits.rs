//! Configurable limits for bounded decoding.

/// Limits enforced while decoding wire values.
///
/// Depth bounds recursion over untrusted input; the buffer cap bounds the
/// memory a single numeric buffer may claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum container nesting depth.
    pub max_depth: usize,

    /// Maximum byte length of one numeric buffer.
    pub max_buffer_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            // Figures rarely nest beyond a dozen levels
            max_depth: 64,
            max_buffer_bytes: 256 * 1024 * 1024,
        }
    }
}

impl Limits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_depth: 16,
            max_buffer_bytes: 4096,
        }
    }

    /// Creates limits with no restrictions (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_depth: usize::MAX,
            max_buffer_bytes: usize::MAX,
        }
    }
}
