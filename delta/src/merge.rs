//! Accumulating delta replies into a defaults view.
//!
//! This is a separate operation from diffing: a delta only says what the
//! engine resolved, and the host keeps those values beside (not inside) its
//! authoritative figure.

use figure::Value;

/// Deep-merges `delta` into `defaults`, `delta` winning.
///
/// Undefined holes leave the target untouched. Positional arrays (those
/// holding objects, arrays or holes) merge element by element; any other
/// array replaces the target.
pub fn merge_defaults(defaults: &mut Value, delta: &Value) {
    match delta {
        Value::Undefined => {}
        Value::Object(src) => {
            if !matches!(defaults, Value::Object(_)) {
                *defaults = Value::object();
            }
            if let Value::Object(dst) = defaults {
                for (key, value) in src {
                    merge_defaults(dst.entry(key.clone()).or_insert(Value::Undefined), value);
                }
            }
        }
        Value::Array(src) if is_positional(src) => {
            if !matches!(defaults, Value::Array(_)) {
                *defaults = Value::Array(Vec::new());
            }
            if let Value::Array(dst) = defaults {
                if dst.len() < src.len() {
                    dst.resize(src.len(), Value::Undefined);
                }
                for (slot, value) in dst.iter_mut().zip(src) {
                    merge_defaults(slot, value);
                }
            }
        }
        other => *defaults = other.clone(),
    }
}

/// Overlays user-specified values onto resolved defaults.
///
/// The user's form wins wherever both define a value, so a palette name set
/// by the user is kept instead of its expanded default.
#[must_use]
pub fn resolve_with_defaults(user: &Value, defaults: &Value) -> Value {
    let mut resolved = defaults.clone();
    merge_defaults(&mut resolved, user);
    resolved
}

fn is_positional(items: &[Value]) -> bool {
    items
        .iter()
        .any(|item| item.is_composite() || item.is_undefined())
}
