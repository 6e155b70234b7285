//! Edit operations on a figure's trace list and layout.
//!
//! Every operation validates its indexes before touching the figure, so a
//! rejected edit leaves the figure exactly as it was.

use std::collections::BTreeSet;

use crate::error::{EditError, EditResult};
use crate::nested;
use crate::path::KeyPath;
use crate::value::{Map, Value};

/// A figure: ordered traces plus one layout record.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub traces: Vec<Value>,
    pub layout: Value,
}

impl Default for Figure {
    fn default() -> Self {
        Self {
            traces: Vec::new(),
            layout: Value::object(),
        }
    }
}

impl Figure {
    #[must_use]
    pub fn new(traces: Vec<Value>, layout: Value) -> Self {
        Self { traces, layout }
    }

    #[must_use]
    pub fn trace_count(&self) -> usize {
        self.traces.len()
    }

    /// Finds the position of the trace whose `uid` equals `uid`.
    #[must_use]
    pub fn trace_index_by_uid(&self, uid: &str) -> Option<usize> {
        self.traces
            .iter()
            .position(|trace| trace.get("uid").and_then(Value::as_str) == Some(uid))
    }
}

/// Which traces an edit addresses.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TraceSelection {
    /// Every trace.
    #[default]
    All,
    One(usize),
    Many(Vec<usize>),
}

impl From<usize> for TraceSelection {
    fn from(index: usize) -> Self {
        Self::One(index)
    }
}

impl From<Vec<usize>> for TraceSelection {
    fn from(indexes: Vec<usize>) -> Self {
        Self::Many(indexes)
    }
}

/// Resolves a selection against the current trace count.
#[must_use]
pub fn normalize_trace_indexes(selection: &TraceSelection, trace_count: usize) -> Vec<usize> {
    match selection {
        TraceSelection::All => (0..trace_count).collect(),
        TraceSelection::One(index) => vec![*index],
        TraceSelection::Many(indexes) => indexes.clone(),
    }
}

/// Property assignments keyed by parsed path, in key order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyEdits {
    entries: Vec<(KeyPath, Value)>,
}

impl PropertyEdits {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses every key of `map` as a [`KeyPath`].
    pub fn from_map(map: &Map) -> EditResult<Self> {
        let entries = map
            .iter()
            .map(|(key, value)| Ok((KeyPath::parse(key)?, value.clone())))
            .collect::<EditResult<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// Adds one assignment.
    #[must_use]
    pub fn with(mut self, path: KeyPath, value: impl Into<Value>) -> Self {
        self.entries.push((path, value.into()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&KeyPath, &Value)> {
        self.entries.iter().map(|(path, value)| (path, value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flat object form (`{"marker.size[2]": 4}`), as carried on the wire.
    #[must_use]
    pub fn to_map(&self) -> Map {
        self.entries
            .iter()
            .map(|(path, value)| (path.to_string(), value.clone()))
            .collect()
    }
}

fn check_indexes(indexes: &[usize], trace_count: usize) -> EditResult<()> {
    match indexes.iter().find(|&&index| index >= trace_count) {
        Some(&index) => Err(EditError::TraceIndexOutOfRange { index, trace_count }),
        None => Ok(()),
    }
}

fn check_unique(indexes: &[usize]) -> EditResult<()> {
    let mut seen = BTreeSet::new();
    match indexes.iter().find(|index| !seen.insert(**index)) {
        Some(&index) => Err(EditError::DuplicateTraceIndex { index }),
        None => Ok(()),
    }
}

/// Appends traces in input order.
pub fn add_traces(figure: &mut Figure, traces: Vec<Value>) -> EditResult<()> {
    if let Some(bad) = traces.iter().find(|trace| trace.as_object().is_none()) {
        return Err(EditError::NotAnObject {
            found: bad.type_name(),
        });
    }
    figure.traces.extend(traces);
    Ok(())
}

/// Removes traces, highest index first. Returns them in removal order.
pub fn delete_traces(figure: &mut Figure, indexes: &[usize]) -> EditResult<Vec<Value>> {
    check_indexes(indexes, figure.trace_count())?;
    let mut ordered = indexes.to_vec();
    ordered.sort_unstable_by(|a, b| b.cmp(a));
    ordered.dedup();
    Ok(ordered
        .into_iter()
        .map(|index| figure.traces.remove(index))
        .collect())
}

/// Moves `current[i]` to position `new[i]`.
///
/// Traces are extracted highest index first, then re-inserted in ascending
/// target order, so the result is always a permutation.
pub fn move_traces(figure: &mut Figure, current: &[usize], new: &[usize]) -> EditResult<()> {
    if current.len() != new.len() {
        return Err(EditError::LengthMismatch {
            current: current.len(),
            new: new.len(),
        });
    }
    let trace_count = figure.trace_count();
    check_indexes(current, trace_count)?;
    check_indexes(new, trace_count)?;
    check_unique(current)?;
    check_unique(new)?;

    let mut order: Vec<usize> = (0..current.len()).collect();
    order.sort_unstable_by(|&a, &b| current[b].cmp(&current[a]));

    let mut extracted: Vec<(usize, Value)> = order
        .into_iter()
        .map(|pos| (new[pos], figure.traces.remove(current[pos])))
        .collect();
    extracted.sort_by_key(|(target, _)| *target);

    for (target, trace) in extracted {
        figure.traces.insert(target, trace);
    }
    Ok(())
}

/// Applies style edits to the selected traces.
///
/// A plain array value is broadcast cyclically: trace `i` of the selection
/// receives `value[i % len]`. Any other value (typed arrays included) is a
/// constant for every selected trace.
pub fn restyle(figure: &mut Figure, edits: &PropertyEdits, traces: &[usize]) -> EditResult<()> {
    check_indexes(traces, figure.trace_count())?;
    for (path, value) in edits.iter() {
        for (position, &index) in traces.iter().enumerate() {
            let assigned = match value {
                Value::Array(items) if items.is_empty() => break,
                Value::Array(items) => &items[position % items.len()],
                other => other,
            };
            nested::assign(&mut figure.traces[index], path, assigned.clone());
        }
    }
    Ok(())
}

/// Applies layout edits directly to the layout record.
pub fn relayout(figure: &mut Figure, edits: &PropertyEdits) {
    for (path, value) in edits.iter() {
        nested::assign(&mut figure.layout, path, value.clone());
    }
}

/// Restyle followed by relayout over the same trace selection.
pub fn update(
    figure: &mut Figure,
    style: &PropertyEdits,
    layout: &PropertyEdits,
    traces: &[usize],
) -> EditResult<()> {
    restyle(figure, style, traces)?;
    relayout(figure, layout);
    Ok(())
}

/// Deep-merges `styles[i]` into the i-th selected trace, then relayouts.
///
/// Selected traces without a matching style object are left untouched.
pub fn animate(
    figure: &mut Figure,
    styles: &[Value],
    layout: &PropertyEdits,
    traces: &[usize],
) -> EditResult<()> {
    check_indexes(traces, figure.trace_count())?;
    for (style, &index) in styles.iter().zip(traces) {
        if style.as_object().is_some() {
            nested::merge(&mut figure.traces[index], style.clone());
        }
    }
    relayout(figure, layout);
    Ok(())
}

/// Deletes each path from the layout.
pub fn remove_layout_props(figure: &mut Figure, paths: &[KeyPath]) {
    for path in paths {
        nested::delete(&mut figure.layout, path);
    }
}

/// Deletes each path from one trace.
pub fn remove_trace_props(figure: &mut Figure, trace: usize, paths: &[KeyPath]) -> EditResult<()> {
    check_indexes(&[trace], figure.trace_count())?;
    for path in paths {
        nested::delete(&mut figure.traces[trace], path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    fn named(names: &[&str]) -> Figure {
        Figure::new(
            names
                .iter()
                .map(|name| v(json!({ "name": name })))
                .collect(),
            Value::object(),
        )
    }

    fn names(figure: &Figure) -> Vec<&str> {
        figure
            .traces
            .iter()
            .map(|trace| trace.get("name").and_then(Value::as_str).unwrap())
            .collect()
    }

    fn edits(json: serde_json::Value) -> PropertyEdits {
        let Value::Object(map) = v(json) else {
            panic!("edits must be an object");
        };
        PropertyEdits::from_map(&map).unwrap()
    }

    #[test]
    fn normalize_selection() {
        assert_eq!(
            normalize_trace_indexes(&TraceSelection::All, 3),
            vec![0, 1, 2]
        );
        assert_eq!(normalize_trace_indexes(&TraceSelection::One(4), 3), vec![4]);
        assert_eq!(
            normalize_trace_indexes(&TraceSelection::Many(vec![2, 0]), 3),
            vec![2, 0]
        );
        assert!(normalize_trace_indexes(&TraceSelection::All, 0).is_empty());
    }

    #[test]
    fn add_traces_appends_in_order() {
        let mut figure = named(&["a"]);
        add_traces(&mut figure, vec![v(json!({"name": "b"})), v(json!({"name": "c"}))]).unwrap();
        assert_eq!(names(&figure), ["a", "b", "c"]);
    }

    #[test]
    fn add_traces_rejects_non_objects() {
        let mut figure = named(&["a"]);
        let err = add_traces(&mut figure, vec![v(json!({"name": "b"})), Value::from(3)]);
        assert!(matches!(err, Err(EditError::NotAnObject { .. })));
        assert_eq!(names(&figure), ["a"]);
    }

    #[test]
    fn delete_traces_any_order() {
        let mut ascending = named(&["a", "b", "c", "d"]);
        let mut shuffled = ascending.clone();
        delete_traces(&mut ascending, &[0, 2]).unwrap();
        delete_traces(&mut shuffled, &[2, 0]).unwrap();
        assert_eq!(names(&ascending), ["b", "d"]);
        assert_eq!(ascending, shuffled);
    }

    #[test]
    fn delete_traces_out_of_range_leaves_figure() {
        let mut figure = named(&["a", "b"]);
        let err = delete_traces(&mut figure, &[0, 5]).unwrap_err();
        assert_eq!(
            err,
            EditError::TraceIndexOutOfRange {
                index: 5,
                trace_count: 2
            }
        );
        assert_eq!(names(&figure), ["a", "b"]);
    }

    #[test]
    fn move_traces_permutes() {
        let mut figure = named(&["a", "b", "c", "d"]);
        move_traces(&mut figure, &[0, 3], &[3, 0]).unwrap();
        assert_eq!(names(&figure), ["d", "b", "c", "a"]);
    }

    #[test]
    fn move_single_trace_to_front() {
        let mut figure = named(&["a", "b", "c"]);
        move_traces(&mut figure, &[2], &[0]).unwrap();
        assert_eq!(names(&figure), ["c", "a", "b"]);
    }

    #[test]
    fn move_traces_validates() {
        let mut figure = named(&["a", "b"]);
        assert!(matches!(
            move_traces(&mut figure, &[0], &[0, 1]),
            Err(EditError::LengthMismatch { .. })
        ));
        assert!(matches!(
            move_traces(&mut figure, &[0, 0], &[0, 1]),
            Err(EditError::DuplicateTraceIndex { index: 0 })
        ));
        assert_eq!(names(&figure), ["a", "b"]);
    }

    #[test]
    fn restyle_broadcasts_arrays_per_trace() {
        let mut figure = named(&["a", "b", "c"]);
        restyle(&mut figure, &edits(json!({"x": [1, 2, 3]})), &[0, 1, 2]).unwrap();
        let xs: Vec<_> = figure.traces.iter().map(|t| t.get("x").cloned()).collect();
        assert_eq!(
            xs,
            vec![Some(v(json!(1))), Some(v(json!(2))), Some(v(json!(3)))]
        );
    }

    #[test]
    fn restyle_wraps_short_arrays() {
        let mut figure = named(&["a", "b", "c"]);
        restyle(&mut figure, &edits(json!({"x": [1, 2]})), &[0, 1, 2]).unwrap();
        assert_eq!(figure.traces[2].get("x"), Some(&v(json!(1))));
    }

    #[test]
    fn restyle_constant_and_nested_paths() {
        let mut figure = named(&["a", "b"]);
        restyle(
            &mut figure,
            &edits(json!({"marker.color": "red", "x": [[1, 2, 3]]})),
            &[0, 1],
        )
        .unwrap();
        for trace in &figure.traces {
            assert_eq!(trace.get("marker"), Some(&v(json!({"color": "red"}))));
            assert_eq!(trace.get("x"), Some(&v(json!([1, 2, 3]))));
        }
    }

    #[test]
    fn restyle_null_deletes_and_empty_array_is_noop() {
        let mut figure = Figure::new(vec![v(json!({"name": "a", "opacity": 0.5}))], Value::object());
        restyle(&mut figure, &edits(json!({"opacity": null, "name": []})), &[0]).unwrap();
        assert_eq!(figure.traces[0], v(json!({"name": "a"})));
    }

    #[test]
    fn relayout_sets_and_deletes() {
        let mut figure = Figure::default();
        relayout(&mut figure, &edits(json!({"a.b": 5})));
        assert_eq!(figure.layout, v(json!({"a": {"b": 5}})));

        let mut figure = Figure::new(Vec::new(), v(json!({"a": {"b": 5, "c": 6}})));
        relayout(&mut figure, &edits(json!({"a.b": null})));
        assert_eq!(figure.layout, v(json!({"a": {"c": 6}})));
    }

    #[test]
    fn update_applies_both() {
        let mut figure = named(&["a"]);
        update(
            &mut figure,
            &edits(json!({"opacity": 0.3})),
            &edits(json!({"title.text": "t"})),
            &[0],
        )
        .unwrap();
        assert_eq!(figure.traces[0].get("opacity"), Some(&v(json!(0.3))));
        assert_eq!(figure.layout, v(json!({"title": {"text": "t"}})));
    }

    #[test]
    fn animate_merges_one_object_per_trace() {
        let mut figure = Figure::new(
            vec![
                v(json!({"marker": {"color": "red", "size": 2}})),
                v(json!({"marker": {"color": "blue"}})),
            ],
            Value::object(),
        );
        animate(
            &mut figure,
            &[v(json!({"marker": {"size": 9}}))],
            &edits(json!({"xaxis.range": [0, 1]})),
            &[0, 1],
        )
        .unwrap();
        assert_eq!(
            figure.traces[0],
            v(json!({"marker": {"color": "red", "size": 9}}))
        );
        assert_eq!(figure.traces[1], v(json!({"marker": {"color": "blue"}})));
        assert_eq!(figure.layout, v(json!({"xaxis": {"range": [0, 1]}})));
    }

    #[test]
    fn animate_skips_non_object_styles() {
        let mut figure = Figure::new(
            vec![
                v(json!({"uid": "a", "y": [1, 2, 3]})),
                v(json!({"uid": "b"})),
            ],
            Value::object(),
        );
        let before = figure.clone();
        animate(
            &mut figure,
            &[Value::Null, Value::from(5)],
            &PropertyEdits::new(),
            &[0, 1],
        )
        .unwrap();
        assert_eq!(figure, before);
        assert_eq!(figure.trace_index_by_uid("a"), Some(0));
    }

    #[test]
    fn relayout_delete_prunes_emptied_parent() {
        let mut figure = Figure::new(Vec::new(), v(json!({"a": {"b": 5}, "c": 1})));
        relayout(&mut figure, &edits(json!({"a.b": null})));
        assert_eq!(figure.layout, v(json!({"c": 1})));
    }

    #[test]
    fn remove_props() {
        let mut figure = Figure::new(
            vec![v(json!({"marker": {"color": "red", "size": 2}}))],
            v(json!({"title": {"text": "t"}, "width": 400})),
        );
        remove_layout_props(&mut figure, &[KeyPath::parse("title.text").unwrap()]);
        assert_eq!(figure.layout, v(json!({"width": 400})));

        remove_trace_props(&mut figure, 0, &[KeyPath::parse("marker.size").unwrap()]).unwrap();
        assert_eq!(figure.traces[0], v(json!({"marker": {"color": "red"}})));

        assert!(remove_trace_props(&mut figure, 3, &[]).is_err());
    }

    #[test]
    fn property_edits_flat_map_roundtrip() {
        let parsed = edits(json!({"marker.size[2]": 4, "name": "a"}));
        assert_eq!(
            Value::Object(parsed.to_map()),
            v(json!({"marker.size[2]": 4, "name": "a"}))
        );
    }
}
