//! Display side: mirrors host commands into a rendering engine and reports
//! back what the engine resolved.

use std::collections::VecDeque;

use delta::{compute_delta, compute_trace_deltas};
use figure::{normalize_trace_indexes, Figure, KeyPath, PropertyEdits, TraceSelection, Value};
use tracing::{debug, warn};
use wire::{decode, encode, Limits, WireValue};

use crate::dispatch;
use crate::engine::{DisplayEngine, NativeEvent, Notify};
use crate::error::SyncResult;
use crate::events::points_event;
use crate::limits::SyncLimits;
use crate::protocol::{CommandKind, DisplayEvent, DisplayId, EditId, HostCommand};
use crate::store::FigureSnapshot;
use crate::transport::Transport;

/// A reply owed to the host, in command order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingReply {
    trace_edit_id: Option<EditId>,
    layout_edit_id: Option<EditId>,
    trace_deltas: bool,
    layout_delta: bool,
    /// Adapter-started renders still to finish before the reply is sent.
    renders: usize,
}

impl PendingReply {
    const fn is_ready(&self) -> bool {
        self.renders == 0
    }
}

/// Binds one engine to the host.
///
/// Keeps its own working copy of the figure. Host commands are applied to
/// the copy and forwarded to the engine silently; once the engine has
/// rendered, the adapter replies with what the engine resolved beyond the
/// copy. Replies leave in the order their commands arrived.
#[derive(Debug)]
pub struct DisplayAdapter<E> {
    id: DisplayId,
    engine: E,
    figure: Figure,
    config: Value,
    pending: VecDeque<PendingReply>,
    limits: SyncLimits,
    wire_limits: Limits,
}

impl<E: DisplayEngine> DisplayAdapter<E> {
    /// Renders `snapshot` and connects to the transport.
    ///
    /// The first reply is tagged with the snapshot's last edit ids so the
    /// host accepts it.
    pub fn attach(
        id: DisplayId,
        mut engine: E,
        snapshot: FigureSnapshot,
        config: Value,
        transport: &mut impl Transport,
    ) -> Self {
        transport.connect(id);
        engine.render(snapshot.figure.clone(), &config);
        let mut pending = VecDeque::new();
        pending.push_back(PendingReply {
            trace_edit_id: snapshot.last_trace_edit_id,
            layout_edit_id: snapshot.last_layout_edit_id,
            trace_deltas: true,
            layout_delta: true,
            renders: 1,
        });
        debug!(
            display = id.0,
            traces = snapshot.figure.trace_count(),
            "display attached"
        );
        Self {
            id,
            engine,
            figure: snapshot.figure,
            config,
            pending,
            limits: SyncLimits::default(),
            wire_limits: Limits::default(),
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: SyncLimits, wire_limits: Limits) -> Self {
        self.limits = limits;
        self.wire_limits = wire_limits;
        self
    }

    #[must_use]
    pub const fn id(&self) -> DisplayId {
        self.id
    }

    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// The adapter's working copy of the figure.
    #[must_use]
    pub const fn figure(&self) -> &Figure {
        &self.figure
    }

    #[must_use]
    pub const fn config(&self) -> &Value {
        &self.config
    }

    /// Replies still owed to the host.
    #[must_use]
    pub fn pending_replies(&self) -> usize {
        self.pending.len()
    }

    pub fn resize(&mut self) {
        self.engine.resize();
    }

    /// Purges the engine and disconnects. Returns the engine.
    pub fn detach(mut self, transport: &mut impl Transport) -> E {
        self.engine.purge();
        transport.disconnect(self.id);
        debug!(
            display = self.id.0,
            dropped = self.pending.len(),
            "display detached"
        );
        self.engine
    }

    /// Applies pending host commands, handles engine events, then sends
    /// every reply that is ready.
    ///
    /// Bad commands are logged and skipped. Fails only if this display is
    /// not connected.
    pub fn poll(&mut self, transport: &mut impl Transport) -> SyncResult<()> {
        while let Some((kind, payload)) = transport.next_command(self.id)? {
            match self.read_command(kind, &payload) {
                Ok(command) => self.handle_command(command),
                Err(err) => warn!(
                    display = self.id.0,
                    kind = kind.name(),
                    error = %err,
                    "skipping command"
                ),
            }
        }
        while let Some(event) = self.engine.poll_native_event() {
            self.handle_native_event(transport, event);
        }
        self.flush_replies(transport);
        Ok(())
    }

    fn read_command(&self, kind: CommandKind, payload: &WireValue) -> SyncResult<HostCommand> {
        let value = decode(payload, &self.wire_limits)?;
        HostCommand::parse(kind, &value)
    }

    fn handle_command(&mut self, command: HostCommand) {
        let kind = command.kind().name();
        if let HostCommand::AddTraces { traces, .. } = &command {
            let actual = self.figure.trace_count() + traces.len();
            if actual > self.limits.max_traces {
                warn!(
                    display = self.id.0,
                    limit = self.limits.max_traces,
                    actual,
                    "skipping add_traces over trace limit"
                );
                return;
            }
        }
        if let Err(err) = dispatch::apply(&mut self.figure, &command) {
            warn!(display = self.id.0, kind, error = %err, "skipping command");
            return;
        }

        let tags = *command.tags();
        // The originating engine already shows this edit.
        let own = tags.source == Some(self.id);
        if !own {
            self.forward(command);
        }
        self.queue_reply(PendingReply {
            trace_edit_id: tags.trace_edit_id,
            layout_edit_id: tags.layout_edit_id,
            trace_deltas: tags.trace_edit_id.is_some(),
            layout_delta: tags.layout_edit_id.is_some(),
            renders: usize::from(!own),
        });
        debug!(display = self.id.0, kind, forwarded = !own, "command applied");
    }

    /// Hands the engine its own copy of the command's data.
    fn forward(&mut self, command: HostCommand) {
        let trace_count = self.figure.trace_count();
        let engine = &mut self.engine;
        match command {
            HostCommand::AddTraces { traces, .. } => engine.add_traces(traces),
            HostCommand::DeleteTraces { indexes, .. } => engine.delete_traces(&indexes),
            HostCommand::MoveTraces { current, new, .. } => engine.move_traces(&current, &new),
            HostCommand::Restyle { edits, traces, .. } => {
                let traces = normalize_trace_indexes(&traces, trace_count);
                engine.restyle(&edits, &traces, Notify::Silent);
            }
            HostCommand::Relayout { edits, .. } => engine.relayout(&edits, Notify::Silent),
            HostCommand::Update {
                style,
                layout,
                traces,
                ..
            } => {
                let traces = normalize_trace_indexes(&traces, trace_count);
                engine.update(&style, &layout, &traces, Notify::Silent);
            }
            HostCommand::Animate {
                styles,
                layout,
                traces,
                options,
                ..
            } => {
                let traces = normalize_trace_indexes(&traces, trace_count);
                engine.animate(&styles, &layout, &traces, &options);
            }
            HostCommand::RemoveLayoutProps { paths, .. } => {
                engine.relayout(&removals(paths), Notify::Silent);
            }
            HostCommand::RemoveTraceProps { trace, paths, .. } => {
                engine.restyle(&removals(paths), &[trace], Notify::Silent);
            }
        }
    }

    /// Queues `reply`. When the queue is full the reply is dropped, but the
    /// render it waits on is charged to the newest queued reply so later
    /// `AfterPlot`s still line up with their commands.
    fn queue_reply(&mut self, reply: PendingReply) {
        if self.pending.len() < self.limits.max_pending_replies {
            self.pending.push_back(reply);
            return;
        }
        warn!(
            display = self.id.0,
            limit = self.limits.max_pending_replies,
            trace_edit_id = ?reply.trace_edit_id,
            layout_edit_id = ?reply.layout_edit_id,
            "reply queue full, dropping reply"
        );
        if let Some(last) = self.pending.back_mut() {
            last.renders += reply.renders;
        }
    }

    fn handle_native_event(&mut self, transport: &mut impl Transport, event: NativeEvent) {
        let report = match event {
            NativeEvent::AfterPlot { notify } => {
                if notify == Notify::Silent {
                    if let Some(reply) = self.pending.iter_mut().find(|reply| !reply.is_ready()) {
                        reply.renders -= 1;
                    }
                }
                return;
            }
            NativeEvent::Restyle { notify, .. }
            | NativeEvent::Relayout { notify, .. }
            | NativeEvent::Update { notify, .. }
                if notify == Notify::Silent =>
            {
                debug!(display = self.id.0, "dropping echo of forwarded edit");
                return;
            }
            NativeEvent::Restyle { edits, traces, .. } => DisplayEvent::Restyle {
                edits,
                traces: TraceSelection::Many(traces),
                source: self.id,
            },
            NativeEvent::Relayout { edits, .. } => DisplayEvent::Relayout {
                edits,
                source: self.id,
            },
            NativeEvent::Update {
                style,
                layout,
                traces,
                ..
            } => DisplayEvent::Update {
                style,
                layout,
                traces: TraceSelection::Many(traces),
                source: self.id,
            },
            NativeEvent::Pointer {
                event_type,
                payload,
            } => match points_event(event_type, &payload) {
                Some(event) => DisplayEvent::Points {
                    event,
                    source: self.id,
                },
                None => return,
            },
        };
        self.send(transport, &report);
    }

    fn flush_replies(&mut self, transport: &mut impl Transport) {
        while self.pending.front().is_some_and(PendingReply::is_ready) {
            let Some(reply) = self.pending.pop_front() else {
                break;
            };
            if reply.trace_deltas {
                let deltas = compute_trace_deltas(&self.engine.full_data(), &self.figure.traces);
                self.send(
                    transport,
                    &DisplayEvent::TraceDeltas {
                        deltas,
                        trace_edit_id: reply.trace_edit_id,
                        source: self.id,
                    },
                );
            }
            if reply.layout_delta {
                let delta = compute_delta(&self.engine.full_layout(), &self.figure.layout);
                self.send(
                    transport,
                    &DisplayEvent::LayoutDelta {
                        delta,
                        layout_edit_id: reply.layout_edit_id,
                        source: self.id,
                    },
                );
            }
        }
    }

    fn send(&self, transport: &mut impl Transport, event: &DisplayEvent) {
        debug!(display = self.id.0, kind = event.kind().name(), "sending event");
        transport.send_event(event.kind(), encode(&event.to_value()));
    }
}

/// Edits that delete each path.
fn removals(paths: Vec<KeyPath>) -> PropertyEdits {
    paths
        .into_iter()
        .fold(PropertyEdits::new(), |edits, path| edits.with(path, Value::Null))
}
