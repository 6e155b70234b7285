//! Routes host commands to figure edit operations.

use figure::{
    add_traces, animate, delete_traces, move_traces, normalize_trace_indexes, relayout,
    remove_layout_props, remove_trace_props, restyle, update, EditResult, Figure,
};

use crate::protocol::HostCommand;

/// Applies `command` to `figure`.
///
/// Trace selections are resolved against the figure's current trace count.
/// On error the figure is left unchanged.
pub fn apply(figure: &mut Figure, command: &HostCommand) -> EditResult<()> {
    match command {
        HostCommand::AddTraces { traces, .. } => add_traces(figure, traces.clone()),
        HostCommand::DeleteTraces { indexes, .. } => delete_traces(figure, indexes).map(drop),
        HostCommand::MoveTraces { current, new, .. } => move_traces(figure, current, new),
        HostCommand::Restyle { edits, traces, .. } => {
            let traces = normalize_trace_indexes(traces, figure.trace_count());
            restyle(figure, edits, &traces)
        }
        HostCommand::Relayout { edits, .. } => {
            relayout(figure, edits);
            Ok(())
        }
        HostCommand::Update {
            style,
            layout,
            traces,
            ..
        } => {
            let traces = normalize_trace_indexes(traces, figure.trace_count());
            update(figure, style, layout, &traces)
        }
        HostCommand::Animate {
            styles,
            layout,
            traces,
            ..
        } => {
            let traces = normalize_trace_indexes(traces, figure.trace_count());
            animate(figure, styles, layout, &traces)
        }
        HostCommand::RemoveLayoutProps { paths, .. } => {
            remove_layout_props(figure, paths);
            Ok(())
        }
        HostCommand::RemoveTraceProps { trace, paths, .. } => {
            remove_trace_props(figure, *trace, paths)
        }
    }
}
