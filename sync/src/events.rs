//! Structured records built from engine interaction payloads.
//!
//! Engine payloads use the engine's own field names (`curveNumber`,
//! `pointNumber`, `lassoPoints`, ...). Extraction is lenient: anything not
//! recognized yields `None` rather than an error.

use std::collections::BTreeMap;
use std::fmt;

use figure::{Map, Value};

/// Kind of pointer interaction reported with points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointsEventType {
    Click,
    Hover,
    Unhover,
    Selected,
    Deselect,
}

impl PointsEventType {
    pub const ALL: [Self; 5] = [
        Self::Click,
        Self::Hover,
        Self::Unhover,
        Self::Selected,
        Self::Deselect,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Click => "plotly_click",
            Self::Hover => "plotly_hover",
            Self::Unhover => "plotly_unhover",
            Self::Selected => "plotly_selected",
            Self::Deselect => "plotly_deselect",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for PointsEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Points touched by an interaction, as parallel columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Points {
    pub trace_indexes: Vec<usize>,
    pub point_indexes: Vec<usize>,
    pub xs: Vec<Value>,
    pub ys: Vec<Value>,
    /// Present only for three-dimensional traces.
    pub zs: Option<Vec<Value>>,
}

impl Points {
    #[must_use]
    pub fn len(&self) -> usize {
        self.point_indexes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.point_indexes.is_empty()
    }

    /// Groups points by trace index, in ascending trace order.
    #[must_use]
    pub fn split_by_trace(&self) -> Vec<(usize, Self)> {
        let mut groups: BTreeMap<usize, Self> = BTreeMap::new();
        for (i, &trace) in self.trace_indexes.iter().enumerate() {
            let group = groups.entry(trace).or_insert_with(|| Self {
                zs: self.zs.as_ref().map(|_| Vec::new()),
                ..Self::default()
            });
            group.trace_indexes.push(trace);
            group.point_indexes.push(self.point_indexes[i]);
            group.xs.push(self.xs[i].clone());
            group.ys.push(self.ys[i].clone());
            if let (Some(zs), Some(source)) = (group.zs.as_mut(), self.zs.as_ref()) {
                zs.push(source[i].clone());
            }
        }
        groups.into_iter().collect()
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("trace_indexes".into(), index_list(&self.trace_indexes));
        map.insert("point_indexes".into(), index_list(&self.point_indexes));
        map.insert("xs".into(), Value::Array(self.xs.clone()));
        map.insert("ys".into(), Value::Array(self.ys.clone()));
        if let Some(zs) = &self.zs {
            map.insert("zs".into(), Value::Array(zs.clone()));
        }
        Value::Object(map)
    }

    /// Reads the form produced by [`Points::to_value`]. Columns must agree in
    /// length.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let points = Self {
            trace_indexes: indexes(value.get("trace_indexes")?)?,
            point_indexes: indexes(value.get("point_indexes")?)?,
            xs: value.get("xs")?.as_array()?.to_vec(),
            ys: value.get("ys")?.as_array()?.to_vec(),
            zs: match value.get("zs") {
                Some(zs) if !zs.is_nullish() => Some(zs.as_array()?.to_vec()),
                _ => None,
            },
        };
        let len = points.trace_indexes.len();
        let consistent = points.point_indexes.len() == len
            && points.xs.len() == len
            && points.ys.len() == len
            && points.zs.as_ref().map_or(true, |zs| zs.len() == len);
        consistent.then_some(points)
    }
}

/// Modifier keys and buttons at the time of the interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceState {
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub button: Option<i32>,
    pub buttons: Option<i32>,
}

impl DeviceState {
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("alt".into(), Value::Bool(self.alt));
        map.insert("ctrl".into(), Value::Bool(self.ctrl));
        map.insert("meta".into(), Value::Bool(self.meta));
        map.insert("shift".into(), Value::Bool(self.shift));
        map.insert("button".into(), self.button.map(f64::from).into());
        map.insert("buttons".into(), self.buttons.map(f64::from).into());
        Value::Object(map)
    }

    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let flag = |key: &str| value.get(key).and_then(Value::as_bool).unwrap_or(false);
        value.as_object()?;
        Some(Self {
            alt: flag("alt"),
            ctrl: flag("ctrl"),
            meta: flag("meta"),
            shift: flag("shift"),
            button: value.get("button").and_then(as_i32),
            buttons: value.get("buttons").and_then(as_i32),
        })
    }
}

/// Region drawn by a selection gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Box { xrange: Value, yrange: Value },
    Lasso { xs: Value, ys: Value },
}

impl Selector {
    #[must_use]
    pub fn to_value(&self) -> Value {
        let (kind, state) = match self {
            Self::Box { xrange, yrange } => ("box", [("xrange", xrange), ("yrange", yrange)]),
            Self::Lasso { xs, ys } => ("lasso", [("xs", xs), ("ys", ys)]),
        };
        let mut map = Map::new();
        map.insert("type".into(), Value::from(kind));
        map.insert(
            "selector_state".into(),
            Value::Object(
                state
                    .into_iter()
                    .map(|(key, value)| (key.to_owned(), value.clone()))
                    .collect(),
            ),
        );
        Value::Object(map)
    }

    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let state = value.get("selector_state")?;
        let field = |key: &str| state.get(key).cloned().unwrap_or(Value::Null);
        match value.get("type")?.as_str()? {
            "box" => Some(Self::Box {
                xrange: field("xrange"),
                yrange: field("yrange"),
            }),
            "lasso" => Some(Self::Lasso {
                xs: field("xs"),
                ys: field("ys"),
            }),
            _ => None,
        }
    }
}

/// One interaction report.
#[derive(Debug, Clone, PartialEq)]
pub struct PointsEvent {
    pub event_type: PointsEventType,
    pub points: Points,
    pub device_state: Option<DeviceState>,
    pub selector: Option<Selector>,
}

impl PointsEvent {
    /// Payload fields for the points event.
    #[must_use]
    pub fn to_map(&self) -> Map {
        let mut map = Map::new();
        map.insert("event_type".into(), Value::from(self.event_type.name()));
        map.insert("points".into(), self.points.to_value());
        if let Some(state) = &self.device_state {
            map.insert("device_state".into(), state.to_value());
        }
        if let Some(selector) = &self.selector {
            map.insert("selector".into(), selector.to_value());
        }
        map
    }

    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            event_type: PointsEventType::from_name(value.get("event_type")?.as_str()?)?,
            points: Points::from_value(value.get("points")?)?,
            device_state: value.get("device_state").and_then(DeviceState::from_value),
            selector: value.get("selector").and_then(Selector::from_value),
        })
    }
}

/// Builds [`Points`] from an engine payload's `points` list.
///
/// Returns `None` when the list is absent or any point lacks its trace or
/// point index. `pointNumber` is preferred, `pointIndex` is the fallback.
/// `zs` is filled only when the first point carries `z`.
#[must_use]
pub fn extract_points(payload: &Value) -> Option<Points> {
    let raw = payload.get("points")?.as_array()?;
    let with_z = raw.first().and_then(|point| point.get("z")).is_some();
    let mut points = Points {
        zs: with_z.then(Vec::new),
        ..Points::default()
    };
    for point in raw {
        let trace = point.get("curveNumber").and_then(Value::as_index)?;
        let index = point
            .get("pointNumber")
            .and_then(Value::as_index)
            .or_else(|| point.get("pointIndex").and_then(Value::as_index))?;
        points.trace_indexes.push(trace);
        points.point_indexes.push(index);
        points.xs.push(column(point, "x"));
        points.ys.push(column(point, "y"));
        if let Some(zs) = points.zs.as_mut() {
            zs.push(column(point, "z"));
        }
    }
    Some(points)
}

/// Reads modifier keys and buttons from the payload's `event`.
#[must_use]
pub fn extract_device_state(payload: &Value) -> Option<DeviceState> {
    let event = payload.get("event")?;
    event.as_object()?;
    let flag = |key: &str| event.get(key).and_then(Value::as_bool).unwrap_or(false);
    Some(DeviceState {
        alt: flag("altKey"),
        ctrl: flag("ctrlKey"),
        meta: flag("metaKey"),
        shift: flag("shiftKey"),
        button: event.get("button").and_then(as_i32),
        buttons: event.get("buttons").and_then(as_i32),
    })
}

/// Reads a box (`range`) or lasso (`lassoPoints`) selection region.
#[must_use]
pub fn extract_selector(payload: &Value) -> Option<Selector> {
    let field = |source: &Value, key: &str| source.get(key).cloned().unwrap_or(Value::Null);
    if let Some(range) = payload.get("range").filter(|range| range.as_object().is_some()) {
        return Some(Selector::Box {
            xrange: field(range, "x"),
            yrange: field(range, "y"),
        });
    }
    let lasso = payload
        .get("lassoPoints")
        .filter(|lasso| lasso.as_object().is_some())?;
    Some(Selector::Lasso {
        xs: field(lasso, "x"),
        ys: field(lasso, "y"),
    })
}

/// Builds a points event; `None` unless the payload carries readable points.
#[must_use]
pub fn points_event(event_type: PointsEventType, payload: &Value) -> Option<PointsEvent> {
    let points = extract_points(payload)?;
    Some(PointsEvent {
        event_type,
        points,
        device_state: extract_device_state(payload),
        selector: extract_selector(payload),
    })
}

fn column(point: &Value, key: &str) -> Value {
    point.get(key).cloned().unwrap_or(Value::Null)
}

fn index_list(indexes: &[usize]) -> Value {
    Value::Array(indexes.iter().map(|&index| Value::from(index)).collect())
}

fn indexes(value: &Value) -> Option<Vec<usize>> {
    value.as_array()?.iter().map(Value::as_index).collect()
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "guarded by the integral and range checks"
)]
fn as_i32(value: &Value) -> Option<i32> {
    value
        .as_f64()
        .filter(|n| n.fract() == 0.0 && (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(n))
        .map(|n| n as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn extracts_points_columns() {
        let payload = v(json!({"points": [
            {"curveNumber": 0, "pointNumber": 2, "x": 1, "y": 4},
            {"curveNumber": 1, "pointIndex": 5, "x": "a", "y": 7}
        ]}));
        let points = extract_points(&payload).unwrap();
        assert_eq!(points.trace_indexes, vec![0, 1]);
        assert_eq!(points.point_indexes, vec![2, 5]);
        assert_eq!(points.xs, vec![Value::from(1), Value::from("a")]);
        assert_eq!(points.ys, vec![Value::from(4), Value::from(7)]);
        assert_eq!(points.zs, None);
    }

    #[test]
    fn z_column_follows_first_point() {
        let payload = v(json!({"points": [
            {"curveNumber": 0, "pointNumber": 0, "x": 1, "y": 2, "z": 3},
            {"curveNumber": 0, "pointNumber": 1, "x": 4, "y": 5}
        ]}));
        let points = extract_points(&payload).unwrap();
        assert_eq!(points.zs, Some(vec![Value::from(3), Value::Null]));
    }

    #[test]
    fn missing_points_yield_none() {
        assert_eq!(extract_points(&v(json!({"event": {}}))), None);
        let no_index = v(json!({"points": [{"curveNumber": 0, "x": 1, "y": 1}]}));
        assert_eq!(extract_points(&no_index), None);
    }

    #[test]
    fn empty_points_list_is_some() {
        let points = extract_points(&v(json!({"points": []}))).unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn device_state_reads_modifiers() {
        let payload = v(json!({"event": {
            "altKey": false, "ctrlKey": true, "metaKey": false, "shiftKey": true,
            "button": 0, "buttons": 1
        }}));
        assert_eq!(
            extract_device_state(&payload),
            Some(DeviceState {
                alt: false,
                ctrl: true,
                meta: false,
                shift: true,
                button: Some(0),
                buttons: Some(1),
            })
        );
        assert_eq!(extract_device_state(&v(json!({}))), None);
    }

    #[test]
    fn box_and_lasso_selectors() {
        let boxed = v(json!({"range": {"x": [0, 1], "y": [2, 3]}}));
        assert_eq!(
            extract_selector(&boxed),
            Some(Selector::Box {
                xrange: v(json!([0, 1])),
                yrange: v(json!([2, 3])),
            })
        );
        let lasso = v(json!({"lassoPoints": {"x": [0, 1, 0], "y": [0, 1, 1]}}));
        assert_eq!(
            extract_selector(&lasso),
            Some(Selector::Lasso {
                xs: v(json!([0, 1, 0])),
                ys: v(json!([0, 1, 1])),
            })
        );
        assert_eq!(extract_selector(&v(json!({"points": []}))), None);
    }

    #[test]
    fn points_event_requires_points() {
        assert!(points_event(PointsEventType::Deselect, &v(json!({}))).is_none());
        let payload = v(json!({
            "points": [{"curveNumber": 0, "pointNumber": 1, "x": 1, "y": 2}],
            "event": {"shiftKey": true}
        }));
        let event = points_event(PointsEventType::Click, &payload).unwrap();
        assert_eq!(event.event_type, PointsEventType::Click);
        assert_eq!(event.points.len(), 1);
        assert!(event.device_state.unwrap().shift);
        assert!(event.selector.is_none());
    }

    #[test]
    fn split_by_trace_groups_columns() {
        let points = Points {
            trace_indexes: vec![1, 0, 1],
            point_indexes: vec![4, 2, 7],
            xs: vec![Value::from(1), Value::from(2), Value::from(3)],
            ys: vec![Value::from(4), Value::from(5), Value::from(6)],
            zs: None,
        };
        let groups = points.split_by_trace();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, 0);
        assert_eq!(groups[0].1.point_indexes, vec![2]);
        assert_eq!(groups[1].0, 1);
        assert_eq!(groups[1].1.point_indexes, vec![4, 7]);
        assert_eq!(groups[1].1.xs, vec![Value::from(1), Value::from(3)]);
    }

    #[test]
    fn event_value_parses_back() {
        let event = PointsEvent {
            event_type: PointsEventType::Selected,
            points: Points {
                trace_indexes: vec![0],
                point_indexes: vec![3],
                xs: vec![Value::from(1.5)],
                ys: vec![Value::from(2)],
                zs: Some(vec![Value::from(0)]),
            },
            device_state: Some(DeviceState {
                buttons: Some(1),
                ..DeviceState::default()
            }),
            selector: Some(Selector::Box {
                xrange: v(json!([0, 2])),
                yrange: v(json!([1, 3])),
            }),
        };
        let parsed = PointsEvent::from_value(&Value::Object(event.to_map())).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let value = v(json!({
            "trace_indexes": [0, 0],
            "point_indexes": [1],
            "xs": [1, 2],
            "ys": [1, 2]
        }));
        assert_eq!(Points::from_value(&value), None);
    }
}
