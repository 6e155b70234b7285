//! The rendering engine a display adapter drives.

use figure::{Figure, PropertyEdits, Value};

use crate::events::PointsEventType;

/// Whether the engine should report an edit back as a user change.
///
/// Edits forwarded from the host are applied [`Notify::Silent`]; the engine
/// echoes the flag on the native event it raises so the adapter can drop it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Notify {
    #[default]
    Report,
    Silent,
}

/// Events raised by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeEvent {
    /// A render finished. `Silent` when it was started by an adapter call,
    /// `Report` when a user interaction started it.
    AfterPlot { notify: Notify },
    Restyle {
        edits: PropertyEdits,
        traces: Vec<usize>,
        notify: Notify,
    },
    Relayout {
        edits: PropertyEdits,
        notify: Notify,
    },
    Update {
        style: PropertyEdits,
        layout: PropertyEdits,
        traces: Vec<usize>,
        notify: Notify,
    },
    /// Pointer interaction with the engine's raw payload.
    Pointer {
        event_type: PointsEventType,
        payload: Value,
    },
}

/// A live rendering surface.
///
/// Calls hand the engine clones or borrows; it never holds the adapter's
/// working figure. Every call that changes the rendering is followed, at
/// some point and in call order, by one [`NativeEvent::AfterPlot`] carrying
/// [`Notify::Silent`].
pub trait DisplayEngine {
    /// Replaces whatever is rendered with `figure`.
    fn render(&mut self, figure: Figure, config: &Value);

    fn add_traces(&mut self, traces: Vec<Value>);

    fn delete_traces(&mut self, indexes: &[usize]);

    fn move_traces(&mut self, current: &[usize], new: &[usize]);

    fn restyle(&mut self, edits: &PropertyEdits, traces: &[usize], notify: Notify);

    fn relayout(&mut self, edits: &PropertyEdits, notify: Notify);

    fn update(
        &mut self,
        style: &PropertyEdits,
        layout: &PropertyEdits,
        traces: &[usize],
        notify: Notify,
    );

    fn animate(&mut self, styles: &[Value], layout: &PropertyEdits, traces: &[usize], options: &Value);

    /// Tears the rendering down.
    fn purge(&mut self);

    /// Re-fits the rendering to its container.
    fn resize(&mut self);

    /// Traces with every engine default filled in.
    fn full_data(&self) -> Vec<Value>;

    /// Layout with every engine default filled in.
    fn full_layout(&self) -> Value;

    fn poll_native_event(&mut self) -> Option<NativeEvent>;
}
