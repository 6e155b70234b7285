//! Commands and events exchanged between the store and its displays.
//!
//! Both directions travel as flat objects whose field names are fixed by the
//! messaging layer (`restyle_data`, `trace_edit_id`, ...). Property paths are
//! parsed into [`KeyPath`]s here, once per message.

use std::fmt;

use figure::{KeyPath, Map, PropertyEdits, TraceSelection, Value};

use crate::error::{SyncError, SyncResult};
use crate::events::PointsEvent;

/// Host-chosen correlation token, echoed on the matching reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EditId(pub u64);

impl fmt::Display for EditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display (rendering surface) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayId(pub u32);

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlation and origin fields carried by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditTags {
    pub trace_edit_id: Option<EditId>,
    pub layout_edit_id: Option<EditId>,
    /// Display whose user interaction caused the edit, if any.
    pub source: Option<DisplayId>,
}

impl EditTags {
    /// Tags for an edit that originated on `source`; ids are assigned later.
    #[must_use]
    pub const fn from_display(source: DisplayId) -> Self {
        Self {
            trace_edit_id: None,
            layout_edit_id: None,
            source: Some(source),
        }
    }
}

/// Command mailbox slots, one per edit kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandKind {
    AddTraces,
    DeleteTraces,
    MoveTraces,
    Restyle,
    Relayout,
    Update,
    Animate,
    RemoveLayoutProps,
    RemoveTraceProps,
}

impl CommandKind {
    pub const ALL: [Self; 9] = [
        Self::AddTraces,
        Self::DeleteTraces,
        Self::MoveTraces,
        Self::Restyle,
        Self::Relayout,
        Self::Update,
        Self::Animate,
        Self::RemoveLayoutProps,
        Self::RemoveTraceProps,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AddTraces => "add_traces",
            Self::DeleteTraces => "delete_traces",
            Self::MoveTraces => "move_traces",
            Self::Restyle => "restyle",
            Self::Relayout => "relayout",
            Self::Update => "update",
            Self::Animate => "animate",
            Self::RemoveLayoutProps => "remove_layout_props",
            Self::RemoveTraceProps => "remove_trace_props",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An edit issued by the host and applied by every display.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    AddTraces {
        traces: Vec<Value>,
        tags: EditTags,
    },
    DeleteTraces {
        indexes: Vec<usize>,
        tags: EditTags,
    },
    MoveTraces {
        current: Vec<usize>,
        new: Vec<usize>,
        tags: EditTags,
    },
    Restyle {
        edits: PropertyEdits,
        traces: TraceSelection,
        tags: EditTags,
    },
    Relayout {
        edits: PropertyEdits,
        tags: EditTags,
    },
    Update {
        style: PropertyEdits,
        layout: PropertyEdits,
        traces: TraceSelection,
        tags: EditTags,
    },
    Animate {
        styles: Vec<Value>,
        layout: PropertyEdits,
        traces: TraceSelection,
        /// Transition options, passed through to the engine untouched.
        options: Value,
        tags: EditTags,
    },
    RemoveLayoutProps {
        paths: Vec<KeyPath>,
        tags: EditTags,
    },
    RemoveTraceProps {
        trace: usize,
        paths: Vec<KeyPath>,
        tags: EditTags,
    },
}

impl HostCommand {
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::AddTraces { .. } => CommandKind::AddTraces,
            Self::DeleteTraces { .. } => CommandKind::DeleteTraces,
            Self::MoveTraces { .. } => CommandKind::MoveTraces,
            Self::Restyle { .. } => CommandKind::Restyle,
            Self::Relayout { .. } => CommandKind::Relayout,
            Self::Update { .. } => CommandKind::Update,
            Self::Animate { .. } => CommandKind::Animate,
            Self::RemoveLayoutProps { .. } => CommandKind::RemoveLayoutProps,
            Self::RemoveTraceProps { .. } => CommandKind::RemoveTraceProps,
        }
    }

    #[must_use]
    pub const fn tags(&self) -> &EditTags {
        match self {
            Self::AddTraces { tags, .. }
            | Self::DeleteTraces { tags, .. }
            | Self::MoveTraces { tags, .. }
            | Self::Restyle { tags, .. }
            | Self::Relayout { tags, .. }
            | Self::Update { tags, .. }
            | Self::Animate { tags, .. }
            | Self::RemoveLayoutProps { tags, .. }
            | Self::RemoveTraceProps { tags, .. } => tags,
        }
    }

    pub fn tags_mut(&mut self) -> &mut EditTags {
        match self {
            Self::AddTraces { tags, .. }
            | Self::DeleteTraces { tags, .. }
            | Self::MoveTraces { tags, .. }
            | Self::Restyle { tags, .. }
            | Self::Relayout { tags, .. }
            | Self::Update { tags, .. }
            | Self::Animate { tags, .. }
            | Self::RemoveLayoutProps { tags, .. }
            | Self::RemoveTraceProps { tags, .. } => tags,
        }
    }

    /// Parses a command payload delivered through the `kind` slot.
    pub fn parse(kind: CommandKind, payload: &Value) -> SyncResult<Self> {
        let fields = Fields::new(kind.name(), payload, malformed_command)?;
        let tags = EditTags {
            trace_edit_id: fields.edit_id("trace_edit_id")?,
            layout_edit_id: fields.edit_id("layout_edit_id")?,
            source: fields.display("source_view_id")?,
        };
        let command = match kind {
            CommandKind::AddTraces => Self::AddTraces {
                traces: fields.array("trace_data")?.to_vec(),
                tags,
            },
            CommandKind::DeleteTraces => Self::DeleteTraces {
                indexes: fields.indexes("delete_inds")?,
                tags,
            },
            CommandKind::MoveTraces => Self::MoveTraces {
                current: fields.indexes("current_trace_inds")?,
                new: fields.indexes("new_trace_inds")?,
                tags,
            },
            CommandKind::Restyle => Self::Restyle {
                edits: fields.edits("restyle_data")?,
                traces: fields.selection("restyle_traces")?,
                tags,
            },
            CommandKind::Relayout => Self::Relayout {
                edits: fields.edits("relayout_data")?,
                tags,
            },
            CommandKind::Update => Self::Update {
                style: fields.edits("style_data")?,
                layout: fields.edits("layout_data")?,
                traces: fields.selection("style_traces")?,
                tags,
            },
            CommandKind::Animate => Self::Animate {
                styles: fields.styles("style_data")?,
                layout: fields.edits("layout_data")?,
                traces: fields.selection("style_traces")?,
                options: fields.optional("animation_opts").cloned().unwrap_or_default(),
                tags,
            },
            CommandKind::RemoveLayoutProps => Self::RemoveLayoutProps {
                paths: fields.paths("remove_props")?,
                tags,
            },
            CommandKind::RemoveTraceProps => Self::RemoveTraceProps {
                trace: fields.index("remove_trace")?,
                paths: fields.paths("remove_props")?,
                tags,
            },
        };
        Ok(command)
    }

    /// Builds the wire payload for this command.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let payload = Payload::new();
        let payload = match self {
            Self::AddTraces { traces, .. } => {
                payload.set("trace_data", Value::Array(traces.clone()))
            }
            Self::DeleteTraces { indexes, .. } => payload.set("delete_inds", index_list(indexes)),
            Self::MoveTraces { current, new, .. } => payload
                .set("current_trace_inds", index_list(current))
                .set("new_trace_inds", index_list(new)),
            Self::Restyle { edits, traces, .. } => payload
                .set("restyle_data", Value::Object(edits.to_map()))
                .selection("restyle_traces", traces),
            Self::Relayout { edits, .. } => {
                payload.set("relayout_data", Value::Object(edits.to_map()))
            }
            Self::Update {
                style,
                layout,
                traces,
                ..
            } => payload
                .set("style_data", Value::Object(style.to_map()))
                .set("layout_data", Value::Object(layout.to_map()))
                .selection("style_traces", traces),
            Self::Animate {
                styles,
                layout,
                traces,
                options,
                ..
            } => payload
                .set("style_data", Value::Array(styles.clone()))
                .set("layout_data", Value::Object(layout.to_map()))
                .selection("style_traces", traces)
                .set("animation_opts", options.clone()),
            Self::RemoveLayoutProps { paths, .. } => payload.set("remove_props", path_list(paths)),
            Self::RemoveTraceProps { trace, paths, .. } => payload
                .set("remove_trace", Value::from(*trace))
                .set("remove_props", path_list(paths)),
        };
        payload.tags(self.tags()).build()
    }
}

/// Event mailbox slots, one per event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Restyle,
    Relayout,
    Update,
    LayoutDelta,
    TraceDeltas,
    Points,
}

impl EventKind {
    pub const ALL: [Self; 6] = [
        Self::Restyle,
        Self::Relayout,
        Self::Update,
        Self::LayoutDelta,
        Self::TraceDeltas,
        Self::Points,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Restyle => "restyle",
            Self::Relayout => "relayout",
            Self::Update => "update",
            Self::LayoutDelta => "layout_delta",
            Self::TraceDeltas => "trace_deltas",
            Self::Points => "points",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A report sent by a display to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    /// The user restyled traces through the display.
    Restyle {
        edits: PropertyEdits,
        traces: TraceSelection,
        source: DisplayId,
    },
    /// The user changed the layout (zoom, pan, drag).
    Relayout {
        edits: PropertyEdits,
        source: DisplayId,
    },
    Update {
        style: PropertyEdits,
        layout: PropertyEdits,
        traces: TraceSelection,
        source: DisplayId,
    },
    /// Layout values the engine resolved beyond the display's mirror.
    LayoutDelta {
        delta: Value,
        layout_edit_id: Option<EditId>,
        source: DisplayId,
    },
    /// Per-trace values the engine resolved, one delta per trace.
    TraceDeltas {
        deltas: Vec<Value>,
        trace_edit_id: Option<EditId>,
        source: DisplayId,
    },
    Points {
        event: PointsEvent,
        source: DisplayId,
    },
}

impl DisplayEvent {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Restyle { .. } => EventKind::Restyle,
            Self::Relayout { .. } => EventKind::Relayout,
            Self::Update { .. } => EventKind::Update,
            Self::LayoutDelta { .. } => EventKind::LayoutDelta,
            Self::TraceDeltas { .. } => EventKind::TraceDeltas,
            Self::Points { .. } => EventKind::Points,
        }
    }

    #[must_use]
    pub const fn source(&self) -> DisplayId {
        match self {
            Self::Restyle { source, .. }
            | Self::Relayout { source, .. }
            | Self::Update { source, .. }
            | Self::LayoutDelta { source, .. }
            | Self::TraceDeltas { source, .. }
            | Self::Points { source, .. } => *source,
        }
    }

    /// Parses an event payload delivered through the `kind` slot.
    pub fn parse(kind: EventKind, payload: &Value) -> SyncResult<Self> {
        let fields = Fields::new(kind.name(), payload, malformed_event)?;
        let source = fields
            .display("source_view_id")?
            .ok_or_else(|| fields.error("missing source_view_id".into()))?;
        let event = match kind {
            EventKind::Restyle => Self::Restyle {
                edits: fields.edits("restyle_data")?,
                traces: fields.selection("restyle_traces")?,
                source,
            },
            EventKind::Relayout => Self::Relayout {
                edits: fields.edits("relayout_data")?,
                source,
            },
            EventKind::Update => Self::Update {
                style: fields.edits("style_data")?,
                layout: fields.edits("layout_data")?,
                traces: fields.selection("style_traces")?,
                source,
            },
            EventKind::LayoutDelta => {
                let delta = fields.required("layout_delta")?;
                if delta.as_object().is_none() {
                    return Err(fields.error("layout_delta must be an object".into()));
                }
                Self::LayoutDelta {
                    delta: delta.clone(),
                    layout_edit_id: fields.edit_id("layout_edit_id")?,
                    source,
                }
            }
            EventKind::TraceDeltas => Self::TraceDeltas {
                deltas: fields.array("trace_deltas")?.to_vec(),
                trace_edit_id: fields.edit_id("trace_edit_id")?,
                source,
            },
            EventKind::Points => Self::Points {
                event: PointsEvent::from_value(payload)
                    .ok_or_else(|| fields.error("unreadable points payload".into()))?,
                source,
            },
        };
        Ok(event)
    }

    /// Builds the wire payload for this event.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let payload = match self {
            Self::Restyle { edits, traces, .. } => Payload::new()
                .set("restyle_data", Value::Object(edits.to_map()))
                .selection("restyle_traces", traces),
            Self::Relayout { edits, .. } => {
                Payload::new().set("relayout_data", Value::Object(edits.to_map()))
            }
            Self::Update {
                style,
                layout,
                traces,
                ..
            } => Payload::new()
                .set("style_data", Value::Object(style.to_map()))
                .set("layout_data", Value::Object(layout.to_map()))
                .selection("style_traces", traces),
            Self::LayoutDelta {
                delta,
                layout_edit_id,
                ..
            } => Payload::new()
                .set("layout_delta", delta.clone())
                .edit_id("layout_edit_id", *layout_edit_id),
            Self::TraceDeltas {
                deltas,
                trace_edit_id,
                ..
            } => Payload::new()
                .set("trace_deltas", Value::Array(deltas.clone()))
                .edit_id("trace_edit_id", *trace_edit_id),
            Self::Points { event, .. } => Payload(event.to_map()),
        };
        payload
            .set("source_view_id", Value::from(self.source().0))
            .build()
    }
}

fn malformed_command(kind: &'static str, reason: String) -> SyncError {
    SyncError::MalformedCommand { kind, reason }
}

fn malformed_event(kind: &'static str, reason: String) -> SyncError {
    SyncError::MalformedEvent { kind, reason }
}

fn index_list(indexes: &[usize]) -> Value {
    Value::Array(indexes.iter().map(|&index| Value::from(index)).collect())
}

fn path_list(paths: &[KeyPath]) -> Value {
    Value::Array(paths.iter().map(|path| Value::from(path.to_string())).collect())
}

/// Typed field access over a payload object.
struct Fields<'a> {
    kind: &'static str,
    map: &'a Map,
    malformed: fn(&'static str, String) -> SyncError,
}

impl<'a> Fields<'a> {
    fn new(
        kind: &'static str,
        payload: &'a Value,
        malformed: fn(&'static str, String) -> SyncError,
    ) -> SyncResult<Self> {
        let map = payload.as_object().ok_or_else(|| {
            malformed(
                kind,
                format!("payload must be an object, found {}", payload.type_name()),
            )
        })?;
        Ok(Self {
            kind,
            map,
            malformed,
        })
    }

    fn error(&self, reason: String) -> SyncError {
        (self.malformed)(self.kind, reason)
    }

    /// Null and undefined fields count as absent.
    fn optional(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|value| !value.is_nullish())
    }

    fn required(&self, key: &str) -> SyncResult<&'a Value> {
        self.optional(key)
            .ok_or_else(|| self.error(format!("missing {key}")))
    }

    fn array(&self, key: &str) -> SyncResult<&'a [Value]> {
        self.required(key)?
            .as_array()
            .ok_or_else(|| self.error(format!("{key} must be an array")))
    }

    fn optional_array(&self, key: &str) -> SyncResult<&'a [Value]> {
        match self.optional(key) {
            None => Ok(&[]),
            Some(value) => value
                .as_array()
                .ok_or_else(|| self.error(format!("{key} must be an array"))),
        }
    }

    /// Per-trace style objects; null entries leave their trace alone.
    fn styles(&self, key: &str) -> SyncResult<Vec<Value>> {
        let styles = self.optional_array(key)?;
        if let Some(other) = styles
            .iter()
            .find(|style| !style.is_nullish() && style.as_object().is_none())
        {
            return Err(self.error(format!(
                "{key} must hold objects, found {}",
                other.type_name()
            )));
        }
        Ok(styles.to_vec())
    }

    fn index(&self, key: &str) -> SyncResult<usize> {
        self.required(key)?
            .as_index()
            .ok_or_else(|| self.error(format!("{key} must be a trace index")))
    }

    fn indexes(&self, key: &str) -> SyncResult<Vec<usize>> {
        self.array(key)?
            .iter()
            .map(|value| {
                value
                    .as_index()
                    .ok_or_else(|| self.error(format!("{key} must hold trace indexes")))
            })
            .collect()
    }

    fn selection(&self, key: &str) -> SyncResult<TraceSelection> {
        match self.optional(key) {
            None => Ok(TraceSelection::All),
            Some(Value::Array(_)) => self.indexes(key).map(TraceSelection::Many),
            Some(value) => value
                .as_index()
                .map(TraceSelection::One)
                .ok_or_else(|| self.error(format!("{key} must be an index or index list"))),
        }
    }

    fn edits(&self, key: &str) -> SyncResult<PropertyEdits> {
        match self.optional(key) {
            None => Ok(PropertyEdits::new()),
            Some(Value::Object(map)) => {
                PropertyEdits::from_map(map).map_err(|err| self.error(err.to_string()))
            }
            Some(other) => Err(self.error(format!(
                "{key} must be an object, found {}",
                other.type_name()
            ))),
        }
    }

    fn paths(&self, key: &str) -> SyncResult<Vec<KeyPath>> {
        self.array(key)?
            .iter()
            .map(|value| {
                let raw = value
                    .as_str()
                    .ok_or_else(|| self.error(format!("{key} must hold property paths")))?;
                KeyPath::parse(raw).map_err(|err| self.error(err.to_string()))
            })
            .collect()
    }

    fn edit_id(&self, key: &str) -> SyncResult<Option<EditId>> {
        self.optional(key)
            .map(|value| {
                value
                    .as_index()
                    .and_then(|id| u64::try_from(id).ok())
                    .map(EditId)
                    .ok_or_else(|| self.error(format!("{key} must be an edit id")))
            })
            .transpose()
    }

    fn display(&self, key: &str) -> SyncResult<Option<DisplayId>> {
        self.optional(key)
            .map(|value| {
                value
                    .as_index()
                    .and_then(|id| u32::try_from(id).ok())
                    .map(DisplayId)
                    .ok_or_else(|| self.error(format!("{key} must be a display id")))
            })
            .transpose()
    }
}

/// Payload object under construction.
struct Payload(Map);

impl Payload {
    fn new() -> Self {
        Self(Map::new())
    }

    fn set(mut self, key: &str, value: Value) -> Self {
        self.0.insert(key.to_owned(), value);
        self
    }

    fn edit_id(self, key: &str, id: Option<EditId>) -> Self {
        match id {
            Some(id) => self.set(key, Value::from(id.0)),
            None => self,
        }
    }

    fn selection(self, key: &str, selection: &TraceSelection) -> Self {
        match selection {
            TraceSelection::All => self,
            TraceSelection::One(index) => self.set(key, Value::from(*index)),
            TraceSelection::Many(indexes) => self.set(key, index_list(indexes)),
        }
    }

    fn tags(self, tags: &EditTags) -> Self {
        let payload = self
            .edit_id("trace_edit_id", tags.trace_edit_id)
            .edit_id("layout_edit_id", tags.layout_edit_id);
        match tags.source {
            Some(source) => payload.set("source_view_id", Value::from(source.0)),
            None => payload,
        }
    }

    fn build(self) -> Value {
        Value::Object(self.0)
    }
}
