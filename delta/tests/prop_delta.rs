use delta::{compute_delta, IDENTITY_KEY, PRIVATE_PREFIX};
use figure::{Map, Value};
use proptest::prelude::*;

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1000i32..1000).prop_map(Value::from),
        "[a-z]{0,6}".prop_map(Value::String),
    ]
}

// No `u` in generated keys, so `uid` only appears where `object()` puts it.
fn key() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-t]{1,4}",
        1 => Just("_meta".to_owned()),
    ]
}

fn object() -> impl Strategy<Value = Value> {
    let value = leaf().prop_recursive(3, 48, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(key(), inner, 0..5).prop_map(Value::Object),
        ]
    });
    (
        prop::collection::btree_map(key(), value, 0..6),
        prop::option::of("[a-z0-9]{1,8}"),
    )
        .prop_map(|(mut map, uid)| {
            if let Some(uid) = uid {
                map.insert(IDENTITY_KEY.to_owned(), Value::String(uid));
            }
            Value::Object(map)
        })
}

// Arrays are skipped: elements with no counterpart are copied verbatim.
fn has_private_key(value: &Value) -> bool {
    match value {
        Value::Object(map) => map
            .iter()
            .any(|(k, v)| k.starts_with(PRIVATE_PREFIX) || has_private_key(v)),
        _ => false,
    }
}

fn only_uid(delta: &Value, source: &Value) -> bool {
    let Value::Object(map) = delta else {
        return false;
    };
    let mut expected = Map::new();
    if let Some(uid) = source.get(IDENTITY_KEY) {
        expected.insert(IDENTITY_KEY.to_owned(), uid.clone());
    }
    map == &expected
}

proptest! {
    #[test]
    fn prop_self_delta_is_empty_except_uid(value in object()) {
        let delta = compute_delta(&value, &value);
        prop_assert!(only_uid(&delta, &value), "delta {:?}", delta);
    }

    #[test]
    fn prop_delta_never_contains_private_keys(full in object(), mirror in object()) {
        prop_assert!(!has_private_key(&compute_delta(&full, &mirror)));
    }
}
