//! Message transport between the store and its displays.

use std::collections::BTreeMap;

use tracing::{debug, warn};
use wire::WireValue;

use crate::error::{SyncError, SyncResult};
use crate::mailbox::{Assignment, Mailbox};
use crate::protocol::{CommandKind, DisplayId, EventKind};

/// Carries wire payloads in both directions.
///
/// Commands fan out to every connected display; events from all displays
/// share one set of slots on the host side.
pub trait Transport {
    /// Opens a command mailbox for `display`.
    fn connect(&mut self, display: DisplayId);

    /// Drops the display's mailbox and anything still pending in it.
    fn disconnect(&mut self, display: DisplayId);

    /// Assigns `payload` to the `kind` slot of every connected display.
    fn broadcast_command(&mut self, kind: CommandKind, payload: WireValue);

    /// Takes the display's oldest pending command.
    fn next_command(&mut self, display: DisplayId)
        -> SyncResult<Option<(CommandKind, WireValue)>>;

    /// Assigns `payload` to the host's `kind` event slot.
    fn send_event(&mut self, kind: EventKind, payload: WireValue);

    /// Takes the host's oldest pending event.
    fn next_event(&mut self) -> Option<(EventKind, WireValue)>;
}

/// In-process transport built on [`Mailbox`]es.
///
/// Every send assigns the slot and then clears its current value, so a
/// repeated identical payload is still delivered.
#[derive(Debug, Clone, Default)]
pub struct LocalTransport {
    commands: BTreeMap<DisplayId, Mailbox<CommandKind, WireValue>>,
    events: Mailbox<EventKind, WireValue>,
}

impl LocalTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_connected(&self, display: DisplayId) -> bool {
        self.commands.contains_key(&display)
    }

    #[must_use]
    pub fn pending_commands(&self, display: DisplayId) -> usize {
        self.commands.get(&display).map_or(0, Mailbox::pending_len)
    }

    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.events.pending_len()
    }
}

impl Transport for LocalTransport {
    fn connect(&mut self, id: DisplayId) {
        self.commands.entry(id).or_default();
        debug!(display = id.0, "display connected");
    }

    fn disconnect(&mut self, id: DisplayId) {
        if let Some(mailbox) = self.commands.remove(&id) {
            debug!(
                display = id.0,
                dropped = mailbox.pending_len(),
                "display disconnected"
            );
        }
    }

    fn broadcast_command(&mut self, kind: CommandKind, payload: WireValue) {
        for (id, mailbox) in &mut self.commands {
            if mailbox.assign(kind, payload.clone()) == Assignment::Superseded {
                warn!(
                    kind = kind.name(),
                    display = id.0,
                    "pending command superseded before delivery"
                );
            }
            mailbox.clear(kind);
        }
    }

    fn next_command(
        &mut self,
        display: DisplayId,
    ) -> SyncResult<Option<(CommandKind, WireValue)>> {
        self.commands
            .get_mut(&display)
            .map(Mailbox::next)
            .ok_or(SyncError::UnknownDisplay { display })
    }

    fn send_event(&mut self, kind: EventKind, payload: WireValue) {
        if self.events.assign(kind, payload) == Assignment::Superseded {
            warn!(kind = kind.name(), "pending event superseded before delivery");
        }
        self.events.clear(kind);
    }

    fn next_event(&mut self) -> Option<(EventKind, WireValue)> {
        self.events.next()
    }
}
