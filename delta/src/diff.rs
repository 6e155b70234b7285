//! Minimal structural delta between a resolved value and its source.

use figure::{Map, Value};

/// Keys starting with this prefix are private to the display engine.
pub const PRIVATE_PREFIX: char = '_';

/// Identity key, always carried in a delta when present.
pub const IDENTITY_KEY: &str = "uid";

/// Returns what `full` holds beyond `authoritative`.
///
/// Walks the keys of `full`:
/// - private keys and `null`/undefined/function values are skipped;
/// - keys deep-equal to their authoritative counterpart are skipped, except
///   [`IDENTITY_KEY`];
/// - nested objects recurse (against `{}` when absent from `authoritative`)
///   and are dropped if nothing differs;
/// - arrays whose first element is an object or array recurse element-wise
///   up to the authoritative length; extra trailing elements pass through
///   verbatim;
/// - scalars, typed arrays, primitive arrays and arrays absent from
///   `authoritative` are copied wholesale.
///
/// The result is always an object.
#[must_use]
pub fn compute_delta(full: &Value, authoritative: &Value) -> Value {
    match full {
        Value::Object(map) => Value::Object(diff_object(map, authoritative.as_object())),
        _ => Value::object(),
    }
}

/// Pairs resolved traces with authoritative traces by position.
///
/// Resolved traces with no authoritative counterpart diff against `{}`.
#[must_use]
pub fn compute_trace_deltas(full_traces: &[Value], traces: &[Value]) -> Vec<Value> {
    full_traces
        .iter()
        .enumerate()
        .map(|(i, full)| compute_delta(full, traces.get(i).unwrap_or(&Value::Undefined)))
        .collect()
}

fn diff_object(full: &Map, authoritative: Option<&Map>) -> Map {
    let mut delta = Map::new();
    for (key, value) in full {
        if key.starts_with(PRIVATE_PREFIX)
            || value.is_nullish()
            || matches!(value, Value::Function(_))
        {
            continue;
        }
        let previous = authoritative.and_then(|map| map.get(key));
        let forced = key == IDENTITY_KEY;
        if !forced && previous == Some(value) {
            continue;
        }

        match (value, previous) {
            (Value::Object(inner), Some(previous)) => {
                let sub = diff_object(inner, previous.as_object());
                if forced || !sub.is_empty() {
                    delta.insert(key.clone(), Value::Object(sub));
                }
            }
            (Value::Object(inner), None) => {
                delta.insert(key.clone(), Value::Object(diff_object(inner, None)));
            }
            (Value::Array(items), Some(previous)) if has_composite_elements(items) => {
                let previous = previous.as_array().unwrap_or(&[]);
                delta.insert(key.clone(), Value::Array(diff_elements(items, previous)));
            }
            _ => {
                delta.insert(key.clone(), value.clone());
            }
        }
    }
    delta
}

fn has_composite_elements(items: &[Value]) -> bool {
    items.first().is_some_and(Value::is_composite)
}

/// Element-wise delta. Equal non-object elements leave an undefined hole so
/// positions line up with the source array; elements past the end of
/// `previous` are copied as they are.
fn diff_elements(items: &[Value], previous: &[Value]) -> Vec<Value> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let Some(prev) = previous.get(i) else {
                return item.clone();
            };
            match item {
                Value::Object(map) => Value::Object(diff_object(map, prev.as_object())),
                _ if prev == item => Value::Undefined,
                Value::Array(inner) if has_composite_elements(inner) => {
                    Value::Array(diff_elements(inner, prev.as_array().unwrap_or(&[])))
                }
                _ => item.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use figure::TypedArray;
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn identical_values_yield_empty_delta() {
        let fig = v(json!({"a": 1, "b": {"c": [1, 2]}, "d": [{"e": 1}]}));
        assert_eq!(compute_delta(&fig, &fig), Value::object());
    }

    #[test]
    fn uid_is_always_included() {
        let trace = v(json!({"uid": "abc", "x": [1]}));
        assert_eq!(compute_delta(&trace, &trace), v(json!({"uid": "abc"})));
    }

    #[test]
    fn private_keys_are_skipped() {
        let full = v(json!({"_input": {"x": 1}, "_index": 0, "type": "scatter"}));
        assert_eq!(
            compute_delta(&full, &Value::object()),
            v(json!({"type": "scatter"}))
        );
    }

    #[test]
    fn nulls_and_functions_are_skipped() {
        let mut full = figure::Map::new();
        full.insert("hover".into(), Value::Function("fmt".into()));
        full.insert("gone".into(), Value::Null);
        full.insert("mode".into(), Value::from("lines"));
        assert_eq!(
            compute_delta(&Value::Object(full), &Value::object()),
            v(json!({"mode": "lines"}))
        );
    }

    #[test]
    fn nested_defaults_only() {
        let full = v(json!({"y": [1, 2, 3], "marker": {"color": "red", "size": 6}}));
        let mirror = v(json!({"y": [1, 2, 3], "marker": {"color": "red"}}));
        assert_eq!(
            compute_delta(&full, &mirror),
            v(json!({"marker": {"size": 6}}))
        );
    }

    #[test]
    fn absent_object_recurses_against_empty() {
        let full = v(json!({"xaxis": {"range": [0, 1], "_private": 1, "title": null}}));
        assert_eq!(
            compute_delta(&full, &Value::object()),
            v(json!({"xaxis": {"range": [0, 1]}}))
        );
    }

    #[test]
    fn primitive_arrays_copied_wholesale() {
        let full = v(json!({"x": [1, 2, 3]}));
        let mirror = v(json!({"x": [1, 2]}));
        assert_eq!(compute_delta(&full, &mirror), full);
    }

    #[test]
    fn typed_arrays_copied_wholesale() {
        let mut full = figure::Map::new();
        full.insert(
            "x".into(),
            Value::Typed(TypedArray::Float64(vec![1.0, 2.0])),
        );
        let full = Value::Object(full);
        let mut mirror = figure::Map::new();
        mirror.insert(
            "x".into(),
            Value::Typed(TypedArray::Float64(vec![1.0, 3.0])),
        );
        assert_eq!(compute_delta(&full, &Value::Object(mirror)), full);
    }

    #[test]
    fn object_arrays_diff_element_wise() {
        let full = v(json!({"annotations": [
            {"text": "a", "x": 1, "showarrow": true},
            {"text": "b", "showarrow": true},
            {"text": "c"}
        ]}));
        let mirror = v(json!({"annotations": [{"text": "a", "x": 1}, {"text": "b"}]}));
        assert_eq!(
            compute_delta(&full, &mirror),
            v(json!({"annotations": [
                {"showarrow": true},
                {"showarrow": true},
                {"text": "c"}
            ]}))
        );
    }

    #[test]
    fn trailing_elements_pass_through_verbatim() {
        let full = v(json!({"annotations": [
            {"text": "a"},
            {"text": "b", "_input": 1, "arrowcolor": null}
        ]}));
        let mirror = v(json!({"annotations": [{"text": "a"}]}));
        assert_eq!(
            compute_delta(&full, &mirror),
            v(json!({"annotations": [
                {},
                {"text": "b", "_input": 1, "arrowcolor": null}
            ]}))
        );
    }

    #[test]
    fn absent_object_arrays_copied_wholesale() {
        let full = v(json!({"shapes": [{"type": "line", "_id": 3}]}));
        assert_eq!(compute_delta(&full, &Value::object()), full);
    }

    #[test]
    fn trace_deltas_pair_by_position() {
        let full = vec![
            v(json!({"uid": "a", "type": "scatter"})),
            v(json!({"uid": "b", "type": "bar"})),
        ];
        let traces = vec![v(json!({"uid": "a", "type": "scatter"}))];
        assert_eq!(
            compute_trace_deltas(&full, &traces),
            vec![
                v(json!({"uid": "a"})),
                v(json!({"uid": "b", "type": "bar"}))
            ]
        );
    }

    #[test]
    fn non_object_full_yields_empty() {
        assert_eq!(compute_delta(&Value::from(3), &Value::object()), Value::object());
    }
}
