//! The data-driven graph router (component G).
//!
//! The original source captures per-step `current_step_id`/`next_step_id`
//! in a closure per node. Here there is exactly one router function of
//! `(current_step_id, state) -> next_step_id`, parameterised by the step
//! list, rather than a closure per node. `None` means the terminal `end`.

use crate::workflow::state::{TaskState, WorkflowRunState};

/// Build the edge-scope: step-ids starting at `start_step_id` (steps earlier
/// in the list are nodes but not sources of outbound edges). If
/// `start_step_id` isn't in the list, the scope is every step (the caller
/// logs the fallback).
pub fn edge_scope<'a>(step_ids: &'a [String], start_step_id: &str) -> Vec<&'a str> {
    match step_ids.iter().position(|id| id == start_step_id) {
        Some(idx) => step_ids[idx..].iter().map(String::as_str).collect(),
        None => step_ids.iter().map(String::as_str).collect(),
    }
}

/// The successor function for `current_step_id`, evaluated against the
/// current state. Consumes `go_to_step_id` if set. Returns `None` for the
/// terminal `end`.
pub fn next_step(current_step_id: &str, state: &mut WorkflowRunState) -> Option<String> {
    if let Some(target) = state.go_to_step_id.take() {
        return Some(target);
    }
    if matches!(
        state.task_state,
        TaskState::InputRequired | TaskState::Failed | TaskState::Canceled
    ) {
        return None;
    }

    let scope = edge_scope(&state.plan.step_ids, &state.plan.start_step_id);
    if !scope.contains(&current_step_id) {
        return None;
    }

    let idx = state.plan.step_ids.iter().position(|id| id == current_step_id);
    let declared_next = idx.and_then(|i| state.plan.next_step_ids.get(i).cloned().flatten());
    match declared_next {
        Some(next) if scope.contains(&next.as_str()) => Some(next),
        _ => None,
    }
}
