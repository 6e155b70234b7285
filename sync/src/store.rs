//! Host side: the authoritative figure and its edit bookkeeping.

use std::collections::{BTreeMap, BTreeSet};

use delta::{merge_defaults, resolve_with_defaults, IDENTITY_KEY};
use figure::{Figure, KeyPath, PropertyEdits, TraceSelection, Value};
use tracing::{debug, warn};
use wire::{decode, encode, Limits};

use crate::dispatch;
use crate::error::{SyncError, SyncResult};
use crate::events::PointsEvent;
use crate::limits::SyncLimits;
use crate::protocol::{CommandKind, DisplayEvent, EditId, EditTags, HostCommand};
use crate::transport::Transport;

/// Receives interaction reports, one call per trace involved.
pub trait FigureObserver {
    fn on_points(&mut self, trace: usize, event: &PointsEvent);
}

/// What a display needs to attach mid-stream.
#[derive(Debug, Clone, PartialEq)]
pub struct FigureSnapshot {
    pub figure: Figure,
    pub last_trace_edit_id: Option<EditId>,
    pub last_layout_edit_id: Option<EditId>,
}

/// Owner of the authoritative figure.
///
/// Host edits apply here first and are then broadcast; user edits reported
/// by a display are applied and re-broadcast tagged with that display. Delta
/// replies accumulate into resolved defaults kept beside the figure.
pub struct Store {
    figure: Figure,
    layout_defaults: Value,
    trace_defaults: BTreeMap<String, Value>,
    next_edit_id: u64,
    next_uid: u64,
    last_trace_edit_id: Option<EditId>,
    last_layout_edit_id: Option<EditId>,
    trace_edit_in_process: bool,
    layout_edit_in_process: bool,
    limits: SyncLimits,
    wire_limits: Limits,
    observer: Option<Box<dyn FigureObserver>>,
}

impl Store {
    /// Takes ownership of `figure`, giving every trace without one a `uid`.
    #[must_use]
    pub fn new(figure: Figure) -> Self {
        let mut store = Self {
            figure: Figure::new(Vec::new(), figure.layout),
            layout_defaults: Value::object(),
            trace_defaults: BTreeMap::new(),
            next_edit_id: 0,
            next_uid: 0,
            last_trace_edit_id: None,
            last_layout_edit_id: None,
            trace_edit_in_process: false,
            layout_edit_in_process: false,
            limits: SyncLimits::default(),
            wire_limits: Limits::default(),
            observer: None,
        };
        let mut traces = figure.traces;
        store.assign_uids(&mut traces);
        store.figure.traces = traces;
        store
    }

    #[must_use]
    pub fn with_limits(mut self, limits: SyncLimits, wire_limits: Limits) -> Self {
        self.limits = limits;
        self.wire_limits = wire_limits;
        self
    }

    pub fn set_observer(&mut self, observer: Box<dyn FigureObserver>) {
        self.observer = Some(observer);
    }

    #[must_use]
    pub const fn figure(&self) -> &Figure {
        &self.figure
    }

    #[must_use]
    pub const fn last_trace_edit_id(&self) -> Option<EditId> {
        self.last_trace_edit_id
    }

    #[must_use]
    pub const fn last_layout_edit_id(&self) -> Option<EditId> {
        self.last_layout_edit_id
    }

    /// `true` until a trace delta reply for the last trace edit arrives.
    #[must_use]
    pub const fn trace_edit_in_process(&self) -> bool {
        self.trace_edit_in_process
    }

    /// `true` until a layout delta reply for the last layout edit arrives.
    #[must_use]
    pub const fn layout_edit_in_process(&self) -> bool {
        self.layout_edit_in_process
    }

    #[must_use]
    pub const fn layout_defaults(&self) -> &Value {
        &self.layout_defaults
    }

    #[must_use]
    pub fn trace_defaults(&self, uid: &str) -> Option<&Value> {
        self.trace_defaults.get(uid)
    }

    /// Layout with resolved defaults filled in under the user's values.
    #[must_use]
    pub fn full_layout(&self) -> Value {
        resolve_with_defaults(&self.figure.layout, &self.layout_defaults)
    }

    /// Trace at `index` with resolved defaults filled in.
    #[must_use]
    pub fn full_trace(&self, index: usize) -> Option<Value> {
        let trace = self.figure.traces.get(index)?;
        Some(self.resolve_trace(trace))
    }

    #[must_use]
    pub fn full_data(&self) -> Vec<Value> {
        self.figure
            .traces
            .iter()
            .map(|trace| self.resolve_trace(trace))
            .collect()
    }

    /// Deep copy of the figure and the edit ids a new display tags its first
    /// replies with.
    #[must_use]
    pub fn snapshot(&self) -> FigureSnapshot {
        FigureSnapshot {
            figure: self.figure.clone(),
            last_trace_edit_id: self.last_trace_edit_id,
            last_layout_edit_id: self.last_layout_edit_id,
        }
    }

    pub fn add_traces(
        &mut self,
        transport: &mut impl Transport,
        mut traces: Vec<Value>,
    ) -> SyncResult<()> {
        let actual = self.figure.trace_count() + traces.len();
        if actual > self.limits.max_traces {
            return Err(SyncError::TraceLimit {
                limit: self.limits.max_traces,
                actual,
            });
        }
        self.assign_uids(&mut traces);
        self.issue(
            transport,
            HostCommand::AddTraces {
                traces,
                tags: EditTags::default(),
            },
        )
    }

    pub fn delete_traces(
        &mut self,
        transport: &mut impl Transport,
        indexes: Vec<usize>,
    ) -> SyncResult<()> {
        self.issue(
            transport,
            HostCommand::DeleteTraces {
                indexes,
                tags: EditTags::default(),
            },
        )
    }

    pub fn move_traces(
        &mut self,
        transport: &mut impl Transport,
        current: Vec<usize>,
        new: Vec<usize>,
    ) -> SyncResult<()> {
        self.issue(
            transport,
            HostCommand::MoveTraces {
                current,
                new,
                tags: EditTags::default(),
            },
        )
    }

    pub fn restyle(
        &mut self,
        transport: &mut impl Transport,
        edits: PropertyEdits,
        traces: TraceSelection,
    ) -> SyncResult<()> {
        self.issue(
            transport,
            HostCommand::Restyle {
                edits,
                traces,
                tags: EditTags::default(),
            },
        )
    }

    pub fn relayout(
        &mut self,
        transport: &mut impl Transport,
        edits: PropertyEdits,
    ) -> SyncResult<()> {
        self.issue(
            transport,
            HostCommand::Relayout {
                edits,
                tags: EditTags::default(),
            },
        )
    }

    pub fn update(
        &mut self,
        transport: &mut impl Transport,
        style: PropertyEdits,
        layout: PropertyEdits,
        traces: TraceSelection,
    ) -> SyncResult<()> {
        self.issue(
            transport,
            HostCommand::Update {
                style,
                layout,
                traces,
                tags: EditTags::default(),
            },
        )
    }

    pub fn animate(
        &mut self,
        transport: &mut impl Transport,
        styles: Vec<Value>,
        layout: PropertyEdits,
        traces: TraceSelection,
        options: Value,
    ) -> SyncResult<()> {
        self.issue(
            transport,
            HostCommand::Animate {
                styles,
                layout,
                traces,
                options,
                tags: EditTags::default(),
            },
        )
    }

    pub fn remove_layout_props(
        &mut self,
        transport: &mut impl Transport,
        paths: Vec<KeyPath>,
    ) -> SyncResult<()> {
        self.issue(
            transport,
            HostCommand::RemoveLayoutProps {
                paths,
                tags: EditTags::default(),
            },
        )
    }

    pub fn remove_trace_props(
        &mut self,
        transport: &mut impl Transport,
        trace: usize,
        paths: Vec<KeyPath>,
    ) -> SyncResult<()> {
        self.issue(
            transport,
            HostCommand::RemoveTraceProps {
                trace,
                paths,
                tags: EditTags::default(),
            },
        )
    }

    /// Handles every pending display event. Bad events are logged and
    /// skipped.
    pub fn poll(&mut self, transport: &mut impl Transport) {
        while let Some((kind, payload)) = transport.next_event() {
            let event = decode(&payload, &self.wire_limits)
                .map_err(SyncError::from)
                .and_then(|value| DisplayEvent::parse(kind, &value));
            match event {
                Ok(event) => self.handle_event(transport, event),
                Err(err) => warn!(kind = kind.name(), error = %err, "skipping display event"),
            }
        }
    }

    fn handle_event(&mut self, transport: &mut impl Transport, event: DisplayEvent) {
        match event {
            DisplayEvent::Restyle {
                edits,
                traces,
                source,
            } => self.reissue(
                transport,
                HostCommand::Restyle {
                    edits,
                    traces,
                    tags: EditTags::from_display(source),
                },
            ),
            DisplayEvent::Relayout { edits, source } => self.reissue(
                transport,
                HostCommand::Relayout {
                    edits,
                    tags: EditTags::from_display(source),
                },
            ),
            DisplayEvent::Update {
                style,
                layout,
                traces,
                source,
            } => self.reissue(
                transport,
                HostCommand::Update {
                    style,
                    layout,
                    traces,
                    tags: EditTags::from_display(source),
                },
            ),
            DisplayEvent::LayoutDelta {
                delta,
                layout_edit_id,
                source,
            } => {
                if layout_edit_id != self.last_layout_edit_id {
                    warn!(
                        display = source.0,
                        edit_id = ?layout_edit_id,
                        expected = ?self.last_layout_edit_id,
                        "dropping stale layout delta"
                    );
                    return;
                }
                merge_defaults(&mut self.layout_defaults, &delta);
                self.layout_edit_in_process = false;
                debug!(display = source.0, edit_id = ?layout_edit_id, "layout delta merged");
            }
            DisplayEvent::TraceDeltas {
                deltas,
                trace_edit_id,
                source,
            } => {
                if trace_edit_id != self.last_trace_edit_id {
                    warn!(
                        display = source.0,
                        edit_id = ?trace_edit_id,
                        expected = ?self.last_trace_edit_id,
                        "dropping stale trace deltas"
                    );
                    return;
                }
                for delta in &deltas {
                    self.merge_trace_delta(delta);
                }
                self.trace_edit_in_process = false;
                debug!(
                    display = source.0,
                    edit_id = ?trace_edit_id,
                    traces = deltas.len(),
                    "trace deltas merged"
                );
            }
            DisplayEvent::Points { event, .. } => {
                let Some(observer) = self.observer.as_mut() else {
                    return;
                };
                for (trace, points) in event.points.split_by_trace() {
                    observer.on_points(
                        trace,
                        &PointsEvent {
                            event_type: event.event_type,
                            points,
                            device_state: event.device_state,
                            selector: event.selector.clone(),
                        },
                    );
                }
            }
        }
    }

    fn merge_trace_delta(&mut self, delta: &Value) {
        let Some(uid) = delta.get(IDENTITY_KEY).and_then(Value::as_str) else {
            warn!("trace delta without uid");
            return;
        };
        if self.figure.trace_index_by_uid(uid).is_none() {
            debug!(uid, "delta for unknown trace");
            return;
        }
        merge_defaults(
            self.trace_defaults
                .entry(uid.to_owned())
                .or_insert_with(Value::object),
            delta,
        );
    }

    fn reissue(&mut self, transport: &mut impl Transport, command: HostCommand) {
        let kind = command.kind();
        if let Err(err) = self.issue(transport, command) {
            warn!(kind = kind.name(), error = %err, "skipping user edit");
        }
    }

    /// Applies `command`, tags it with fresh edit ids and broadcasts it.
    fn issue(&mut self, transport: &mut impl Transport, mut command: HostCommand) -> SyncResult<()> {
        dispatch::apply(&mut self.figure, &command)?;

        let (traces, layout) = edit_ids_for(command.kind());
        let trace_edit_id = traces.then(|| self.allocate_edit_id());
        let layout_edit_id = layout.then(|| self.allocate_edit_id());
        if trace_edit_id.is_some() {
            self.last_trace_edit_id = trace_edit_id;
            self.trace_edit_in_process = true;
        }
        if layout_edit_id.is_some() {
            self.last_layout_edit_id = layout_edit_id;
            self.layout_edit_in_process = true;
        }
        let tags = command.tags_mut();
        tags.trace_edit_id = trace_edit_id;
        tags.layout_edit_id = layout_edit_id;

        if command.kind() == CommandKind::DeleteTraces {
            let figure = &self.figure;
            self.trace_defaults
                .retain(|uid, _| figure.trace_index_by_uid(uid).is_some());
        }

        transport.broadcast_command(command.kind(), encode(&command.to_value()));
        debug!(
            kind = command.kind().name(),
            trace_edit_id = ?trace_edit_id,
            layout_edit_id = ?layout_edit_id,
            source = ?command.tags().source,
            "command issued"
        );
        Ok(())
    }

    fn allocate_edit_id(&mut self) -> EditId {
        self.next_edit_id += 1;
        EditId(self.next_edit_id)
    }

    fn assign_uids(&mut self, traces: &mut [Value]) {
        let mut taken: BTreeSet<String> = self
            .figure
            .traces
            .iter()
            .chain(traces.iter())
            .filter_map(|trace| trace.get(IDENTITY_KEY).and_then(Value::as_str))
            .map(str::to_owned)
            .collect();
        for trace in traces.iter_mut() {
            let Some(map) = trace.as_object_mut() else {
                continue;
            };
            if map.get(IDENTITY_KEY).and_then(Value::as_str).is_some() {
                continue;
            }
            let uid = loop {
                self.next_uid += 1;
                let candidate = format!("trace-{}", self.next_uid);
                if taken.insert(candidate.clone()) {
                    break candidate;
                }
            };
            map.insert(IDENTITY_KEY.to_owned(), Value::String(uid));
        }
    }

    fn resolve_trace(&self, trace: &Value) -> Value {
        let defaults = trace
            .get(IDENTITY_KEY)
            .and_then(Value::as_str)
            .and_then(|uid| self.trace_defaults.get(uid));
        match defaults {
            Some(defaults) => resolve_with_defaults(trace, defaults),
            None => trace.clone(),
        }
    }
}

/// Which edit ids a command kind allocates: `(trace, layout)`.
const fn edit_ids_for(kind: CommandKind) -> (bool, bool) {
    match kind {
        CommandKind::Relayout | CommandKind::RemoveLayoutProps => (false, true),
        CommandKind::RemoveTraceProps => (true, false),
        CommandKind::AddTraces
        | CommandKind::DeleteTraces
        | CommandKind::MoveTraces
        | CommandKind::Restyle
        | CommandKind::Update
        | CommandKind::Animate => (true, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{DisplayId, EventKind};
    use crate::transport::LocalTransport;
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    fn store() -> Store {
        Store::new(Figure::new(
            vec![v(json!({"y": [1, 2, 3]})), v(json!({"uid": "trace-1"}))],
            Value::object(),
        ))
    }

    fn send(transport: &mut LocalTransport, event: &DisplayEvent) {
        transport.send_event(event.kind(), encode(&event.to_value()));
    }

    #[test]
    fn new_assigns_missing_uids() {
        let store = store();
        let uids: Vec<_> = store
            .figure()
            .traces
            .iter()
            .map(|trace| trace.get("uid").and_then(Value::as_str).unwrap())
            .collect();
        assert_eq!(uids, vec!["trace-2", "trace-1"]);
    }

    #[test]
    fn edit_ids_follow_command_kind() {
        let mut store = store();
        let mut transport = LocalTransport::new();
        store
            .relayout(
                &mut transport,
                PropertyEdits::new().with(KeyPath::key("height"), 400),
            )
            .unwrap();
        assert_eq!(store.last_layout_edit_id(), Some(EditId(1)));
        assert_eq!(store.last_trace_edit_id(), None);
        assert!(store.layout_edit_in_process());
        assert!(!store.trace_edit_in_process());

        store
            .restyle(
                &mut transport,
                PropertyEdits::new().with(KeyPath::key("opacity"), 0.5),
                TraceSelection::All,
            )
            .unwrap();
        assert_eq!(store.last_trace_edit_id(), Some(EditId(2)));
        assert_eq!(store.last_layout_edit_id(), Some(EditId(3)));
    }

    #[test]
    fn rejected_edit_sends_nothing() {
        let mut store = store();
        let mut transport = LocalTransport::new();
        transport.connect(DisplayId(0));
        let err = store.delete_traces(&mut transport, vec![4]).unwrap_err();
        assert!(matches!(err, SyncError::Edit(_)));
        assert_eq!(transport.pending_commands(DisplayId(0)), 0);
        assert_eq!(store.last_trace_edit_id(), None);
    }

    #[test]
    fn trace_limit_is_enforced() {
        let mut store = store().with_limits(SyncLimits::for_testing(), Limits::for_testing());
        let mut transport = LocalTransport::new();
        let traces = vec![Value::object(); 15];
        assert_eq!(
            store.add_traces(&mut transport, traces),
            Err(SyncError::TraceLimit {
                limit: 16,
                actual: 17
            })
        );
    }

    #[test]
    fn matching_layout_delta_merges_into_defaults() {
        let mut store = store();
        let mut transport = LocalTransport::new();
        store
            .relayout(
                &mut transport,
                PropertyEdits::new().with(KeyPath::key("height"), 400),
            )
            .unwrap();
        send(
            &mut transport,
            &DisplayEvent::LayoutDelta {
                delta: v(json!({"width": 700, "height": 1})),
                layout_edit_id: store.last_layout_edit_id(),
                source: DisplayId(0),
            },
        );
        store.poll(&mut transport);
        assert!(!store.layout_edit_in_process());
        assert_eq!(
            store.full_layout(),
            v(json!({"width": 700, "height": 400}))
        );
    }

    #[test]
    fn stale_layout_delta_is_dropped() {
        let mut store = store();
        let mut transport = LocalTransport::new();
        for height in [300, 400] {
            store
                .relayout(
                    &mut transport,
                    PropertyEdits::new().with(KeyPath::key("height"), height),
                )
                .unwrap();
        }
        send(
            &mut transport,
            &DisplayEvent::LayoutDelta {
                delta: v(json!({"width": 700})),
                layout_edit_id: Some(EditId(1)),
                source: DisplayId(0),
            },
        );
        store.poll(&mut transport);
        assert_eq!(store.layout_defaults(), &Value::object());
        assert!(store.layout_edit_in_process());
    }

    #[test]
    fn trace_deltas_match_by_uid() {
        let mut store = store();
        let mut transport = LocalTransport::new();
        send(
            &mut transport,
            &DisplayEvent::TraceDeltas {
                deltas: vec![
                    v(json!({"uid": "trace-1", "type": "bar"})),
                    v(json!({"uid": "gone", "type": "scatter"})),
                    v(json!({"type": "scatter"})),
                ],
                trace_edit_id: None,
                source: DisplayId(0),
            },
        );
        store.poll(&mut transport);
        assert_eq!(
            store.full_trace(1),
            Some(v(json!({"uid": "trace-1", "type": "bar"})))
        );
        assert_eq!(store.trace_defaults("gone"), None);
        assert_eq!(store.full_trace(0), store.figure().traces.first().cloned());
    }

    #[test]
    fn delete_prunes_trace_defaults() {
        let mut store = store();
        let mut transport = LocalTransport::new();
        send(
            &mut transport,
            &DisplayEvent::TraceDeltas {
                deltas: vec![v(json!({"uid": "trace-1", "type": "bar"}))],
                trace_edit_id: None,
                source: DisplayId(0),
            },
        );
        store.poll(&mut transport);
        store.delete_traces(&mut transport, vec![1]).unwrap();
        assert_eq!(store.trace_defaults("trace-1"), None);
    }

    #[test]
    fn user_relayout_is_applied_and_rebroadcast() {
        let mut store = store();
        let mut transport = LocalTransport::new();
        transport.connect(DisplayId(3));
        send(
            &mut transport,
            &DisplayEvent::Relayout {
                edits: PropertyEdits::new().with(
                    KeyPath::parse("xaxis.range").unwrap(),
                    vec![Value::from(0), Value::from(5)],
                ),
                source: DisplayId(2),
            },
        );
        store.poll(&mut transport);
        assert_eq!(
            store.figure().layout,
            v(json!({"xaxis": {"range": [0, 5]}}))
        );
        let (kind, payload) = transport.next_command(DisplayId(3)).unwrap().unwrap();
        let value = decode(&payload, &Limits::default()).unwrap();
        let command = HostCommand::parse(kind, &value).unwrap();
        assert_eq!(command.tags().source, Some(DisplayId(2)));
        assert_eq!(command.tags().layout_edit_id, store.last_layout_edit_id());
    }

    #[test]
    fn malformed_event_is_skipped() {
        let mut store = store();
        let mut transport = LocalTransport::new();
        transport.send_event(EventKind::TraceDeltas, encode(&v(json!({"trace_deltas": 5}))));
        store.poll(&mut transport);
        assert_eq!(transport.pending_events(), 0);
        assert!(!store.trace_edit_in_process());
    }
}
