//! Delta computation for figsync.
//!
//! Given the state a display engine resolved (every default filled in) and
//! the authoritative state the host sent, [`compute_delta`] returns only what
//! the engine added or changed. The host accumulates those replies with
//! [`merge_defaults`].
//!
//! # Design Principles
//!
//! - **Minimal** - Equal subtrees never appear in a delta.
//! - **Identity preserving** - `uid` is always carried so replies can be
//!   matched to traces.
//! - **Buffers stay whole** - Typed and primitive arrays are never split.

mod diff;
mod merge;

pub use diff::{compute_delta, compute_trace_deltas, IDENTITY_KEY, PRIVATE_PREFIX};
pub use merge::{merge_defaults, resolve_with_defaults};
