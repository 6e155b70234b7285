//! Host/display synchronization for figsync.
//!
//! A [`Store`] owns the authoritative figure. Each [`DisplayAdapter`] drives
//! one rendering engine from a private copy of that figure. They talk only
//! through a [`Transport`] carrying wire-encoded [`HostCommand`]s one way and
//! [`DisplayEvent`]s the other, one mailbox slot per message kind.
//!
//! # Design Principles
//!
//! - **One owner** - Only the store's figure is authoritative; displays
//!   mirror it and report what their engines resolved.
//! - **Correlated replies** - Every reply carries the edit id of the command
//!   it answers; the store drops replies for superseded edits.
//! - **No echo loops** - Edits forwarded to an engine are marked
//!   [`Notify::Silent`] and their native echoes are dropped.
//! - **Per-message failure** - A malformed command or event is logged and
//!   skipped; the loop continues.

mod adapter;
pub mod dispatch;
mod engine;
mod error;
pub mod events;
mod limits;
mod mailbox;
mod protocol;
mod store;
mod transport;

pub use adapter::DisplayAdapter;
pub use engine::{DisplayEngine, NativeEvent, Notify};
pub use error::{SyncError, SyncResult};
pub use events::{DeviceState, Points, PointsEvent, PointsEventType, Selector};
pub use limits::SyncLimits;
pub use mailbox::{Assignment, Mailbox};
pub use protocol::{
    CommandKind, DisplayEvent, DisplayId, EditId, EditTags, EventKind, HostCommand,
};
pub use store::{FigureObserver, FigureSnapshot, Store};
pub use transport::{LocalTransport, Transport};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_api_exports() {
        // Verify all expected items are exported
        let _ = SyncLimits::default();
        let _ = LocalTransport::new();
        let _ = Mailbox::<CommandKind, u8>::new();
        let _ = EditTags::default();
        let _ = Notify::Silent;
        let _ = CommandKind::ALL;
        let _ = EventKind::ALL;

        // Error types
        let _: SyncResult<()> = Ok(());
    }

    #[test]
    fn limits_default_is_reasonable() {
        let limits = SyncLimits::default();
        assert!(limits.max_pending_replies >= 16);
        assert!(limits.max_traces >= 1000);
    }
}
