//! Figure data model and edit operations for figsync.
//!
//! This crate defines how a figure is represented and mutated:
//! - A dynamic [`Value`] model with bulk numeric [`TypedArray`]s
//! - Parsed property paths ([`KeyPath`]) and deep get/set/delete/merge
//! - Edit operations over a [`Figure`]: add/delete/move traces, restyle,
//!   relayout, update, animate and property removal
//!
//! # Design Principles
//!
//! - **Validate, then mutate** - A rejected edit leaves the figure untouched.
//! - **Parse once** - Property paths are parsed when a command is built, not
//!   on every application.
//! - **Deterministic** - Objects keep sorted keys so identical inputs produce
//!   identical outputs.

mod edit;
mod error;
pub mod nested;
mod path;
mod typed_array;
mod value;

pub use edit::{
    add_traces, animate, delete_traces, move_traces, normalize_trace_indexes, relayout,
    remove_layout_props, remove_trace_props, restyle, update, Figure, PropertyEdits,
    TraceSelection,
};
pub use error::{EditError, EditResult};
pub use path::{is_blocked_key, KeyPath, PathSegment, BLOCKED_KEYS};
pub use typed_array::{DType, TypedArray};
pub use value::{Map, Value};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_api_exports() {
        // Verify all expected items are exported
        let _ = Figure::default();
        let _ = TraceSelection::All;
        let _ = PropertyEdits::new();
        let _ = DType::Float64.size();
        let _ = Value::object();

        // Error types
        let _: EditResult<()> = Ok(());
    }

    #[test]
    fn default_figure_has_object_layout() {
        let figure = Figure::default();
        assert_eq!(figure.trace_count(), 0);
        assert!(figure.layout.as_object().is_some());
    }

    #[test]
    fn trace_lookup_by_uid() {
        let mut trace = Map::new();
        trace.insert("uid".into(), Value::from("abc"));
        let figure = Figure::new(vec![Value::object(), Value::Object(trace)], Value::object());
        assert_eq!(figure.trace_index_by_uid("abc"), Some(1));
        assert_eq!(figure.trace_index_by_uid("zzz"), None);
    }
}
