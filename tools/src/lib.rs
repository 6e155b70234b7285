//! Inspection and debugging tools for figsync.
//!
//! This crate provides utilities for seeing what the sync layer does with a
//! figure:
//!
//! - Compute the delta a display would reply with
//! - Apply a script of host commands to a figure
//! - Encode JSON to the wire form and decode it back
//!
//! # Design Principles
//!
//! - **First-class tooling** - These tools are part of the product, not afterthoughts.
//! - **Plain JSON in and out** - Figures, commands and wire values are read
//!   and printed as JSON.

use anyhow::{anyhow, bail, Context, Result};
use figure::{DType, Figure, TypedArray, Value};
use serde::Serialize;
use sync::{dispatch, CommandKind, HostCommand};
use wire::{decode, encode, Limits, WireValue};

/// Reads a figure from `{"data": [...], "layout": {...}}`.
///
/// Both keys are optional.
pub fn figure_from_json(json: serde_json::Value) -> Result<Figure> {
    let serde_json::Value::Object(mut map) = json else {
        bail!("figure must be a JSON object");
    };
    let traces = match map.remove("data") {
        None | Some(serde_json::Value::Null) => Vec::new(),
        Some(serde_json::Value::Array(traces)) => traces.into_iter().map(Value::from).collect(),
        Some(_) => bail!("figure data must be an array"),
    };
    let layout = match map.remove("layout") {
        None | Some(serde_json::Value::Null) => Value::object(),
        Some(layout @ serde_json::Value::Object(_)) => Value::from(layout),
        Some(_) => bail!("figure layout must be an object"),
    };
    Ok(Figure::new(traces, layout))
}

#[must_use]
pub fn figure_to_json(figure: &Figure) -> serde_json::Value {
    serde_json::json!({
        "data": figure.traces.iter().map(Value::to_json).collect::<Vec<_>>(),
        "layout": figure.layout.to_json(),
    })
}

/// Parses one scripted command: `{"kind": "restyle", ...payload fields}`.
pub fn parse_command(json: &serde_json::Value) -> Result<HostCommand> {
    let mut map = json
        .as_object()
        .cloned()
        .ok_or_else(|| anyhow!("command must be a JSON object"))?;
    let kind = match map.remove("kind") {
        Some(serde_json::Value::String(name)) => CommandKind::from_name(&name)
            .ok_or_else(|| anyhow!("unknown command kind {name:?}"))?,
        _ => bail!("command is missing a string `kind`"),
    };
    let payload = Value::from(serde_json::Value::Object(map));
    HostCommand::parse(kind, &payload).with_context(|| format!("parse {} command", kind.name()))
}

/// A command that was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCommand {
    pub index: usize,
    pub error: String,
}

/// Outcome of [`apply_script`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub applied: usize,
    pub skipped: Vec<SkippedCommand>,
}

/// Applies `commands` to `figure` in order.
///
/// A bad command is recorded and skipped, the way a display adapter treats
/// it. With `strict`, the first bad command fails the whole script.
pub fn apply_script(
    figure: &mut Figure,
    commands: &[serde_json::Value],
    strict: bool,
) -> Result<ApplyReport> {
    let mut report = ApplyReport::default();
    for (index, json) in commands.iter().enumerate() {
        let outcome = parse_command(json).and_then(|command| {
            dispatch::apply(figure, &command)
                .with_context(|| format!("apply {} command", command.kind().name()))
        });
        match outcome {
            Ok(()) => report.applied += 1,
            Err(err) if strict => return Err(err.context(format!("command {index}"))),
            Err(err) => report.skipped.push(SkippedCommand {
                index,
                error: format!("{err:#}"),
            }),
        }
    }
    Ok(report)
}

/// Delta between a resolved object and its authoritative counterpart.
#[must_use]
pub fn delta_json(full: serde_json::Value, authoritative: serde_json::Value) -> serde_json::Value {
    delta::compute_delta(&Value::from(full), &Value::from(authoritative)).to_json()
}

/// Per-trace deltas between two trace arrays.
pub fn trace_deltas_json(
    full: serde_json::Value,
    authoritative: serde_json::Value,
) -> Result<serde_json::Value> {
    let full = trace_list(full).context("resolved traces")?;
    let authoritative = trace_list(authoritative).context("authoritative traces")?;
    let deltas = delta::compute_trace_deltas(&full, &authoritative);
    Ok(deltas.iter().map(Value::to_json).collect())
}

fn trace_list(json: serde_json::Value) -> Result<Vec<Value>> {
    match json {
        serde_json::Value::Array(traces) => Ok(traces.into_iter().map(Value::from).collect()),
        _ => bail!("expected an array of traces"),
    }
}

/// Encodes JSON into its wire form.
///
/// With `pack`, every non-empty array of plain numbers is first packed into a
/// typed array of that dtype, so it travels as a buffer object.
pub fn encode_json(json: serde_json::Value, pack: Option<DType>) -> Result<serde_json::Value> {
    let mut value = Value::from(json);
    if let Some(dtype) = pack {
        pack_numbers(&mut value, dtype)?;
    }
    serde_json::to_value(encode(&value)).context("serialize wire value")
}

fn pack_numbers(value: &mut Value, dtype: DType) -> Result<()> {
    match value {
        Value::Array(items) if !items.is_empty() && items.iter().all(|item| item.as_f64().is_some()) => {
            let mut array = TypedArray::from_le_bytes(dtype, &vec![0; items.len() * dtype.size()])
                .ok_or_else(|| anyhow!("cannot allocate {dtype} buffer"))?;
            for (index, item) in items.iter().enumerate() {
                if let Some(number) = item.as_f64() {
                    array.set(index, number);
                }
            }
            *value = Value::Typed(array);
        }
        Value::Array(items) => {
            for item in items {
                pack_numbers(item, dtype)?;
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                pack_numbers(item, dtype)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Decodes a wire value given as JSON.
///
/// Buffer objects come back as plain number arrays; absent values are
/// dropped from objects.
pub fn decode_json(json: serde_json::Value, limits: &Limits) -> Result<serde_json::Value> {
    let value = decode(&WireValue::from(json), limits).context("decode wire value")?;
    Ok(value.to_json())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn figure_json_roundtrip() {
        let json = json!({"data": [{"uid": "a", "y": [1, 2]}], "layout": {"height": 300}});
        let figure = figure_from_json(json.clone()).unwrap();
        assert_eq!(figure.trace_count(), 1);
        assert_eq!(figure_to_json(&figure), json);
    }

    #[test]
    fn figure_keys_are_optional() {
        let figure = figure_from_json(json!({})).unwrap();
        assert_eq!(figure, Figure::default());
        assert!(figure_from_json(json!({"data": {}})).is_err());
        assert!(figure_from_json(json!([])).is_err());
    }

    #[test]
    fn parse_command_reads_kind_and_payload() {
        let command = parse_command(&json!({
            "kind": "relayout",
            "relayout_data": {"title.text": "t"},
            "layout_edit_id": 4
        }))
        .unwrap();
        assert_eq!(command.kind(), CommandKind::Relayout);
        assert!(parse_command(&json!({"kind": "nope"})).is_err());
        assert!(parse_command(&json!({"relayout_data": {}})).is_err());
    }

    #[test]
    fn apply_script_skips_bad_commands() {
        let mut figure = figure_from_json(json!({"data": [{"uid": "a"}]})).unwrap();
        let commands = vec![
            json!({"kind": "restyle", "restyle_data": {"marker.color": "red"}}),
            json!({"kind": "delete_traces", "delete_inds": [3]}),
            json!({"kind": "relayout", "relayout_data": {"xaxis.range": [0, 1]}}),
        ];
        let report = apply_script(&mut figure, &commands, false).unwrap();
        assert_eq!(report.applied, 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].index, 1);
        assert_eq!(
            figure_to_json(&figure),
            json!({
                "data": [{"uid": "a", "marker": {"color": "red"}}],
                "layout": {"xaxis": {"range": [0, 1]}}
            })
        );
    }

    #[test]
    fn apply_script_strict_stops_at_first_error() {
        let mut figure = Figure::default();
        let commands = vec![json!({"kind": "delete_traces", "delete_inds": [0]})];
        let err = apply_script(&mut figure, &commands, true).unwrap_err();
        assert!(format!("{err:#}").starts_with("command 0"));
    }

    #[test]
    fn delta_drops_authoritative_fields() {
        let delta = delta_json(
            json!({"uid": "a", "type": "scatter", "y": [1, 2]}),
            json!({"uid": "a", "y": [1, 2]}),
        );
        assert_eq!(delta, json!({"uid": "a", "type": "scatter"}));
    }

    #[test]
    fn trace_deltas_need_arrays() {
        let deltas = trace_deltas_json(
            json!([{"uid": "a", "visible": true}]),
            json!([{"uid": "a"}]),
        )
        .unwrap();
        assert_eq!(deltas, json!([{"uid": "a", "visible": true}]));
        assert!(trace_deltas_json(json!({}), json!([])).is_err());
    }

    #[test]
    fn encode_packs_number_arrays() {
        let wire = encode_json(json!({"y": [1, 2], "name": "n"}), Some(DType::Uint8)).unwrap();
        assert_eq!(
            wire,
            json!({"name": "n", "y": {"dtype": "uint8", "shape": [2.0], "value": [1, 2]}})
        );
    }

    #[test]
    fn encode_without_pack_keeps_arrays() {
        let wire = encode_json(json!({"y": [1, 2]}), None).unwrap();
        assert_eq!(wire, json!({"y": [1.0, 2.0]}));
    }

    #[test]
    fn decode_expands_buffers() {
        let wire = json!({
            "y": {"dtype": "int16", "shape": [2], "value": [1, 0, 255, 255]},
            "gone": "_undefined_"
        });
        let decoded = decode_json(wire, &Limits::default()).unwrap();
        assert_eq!(decoded, json!({"y": [1, -1]}));
    }
}
