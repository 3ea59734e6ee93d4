//! The run state threaded through graph execution.
//!
//! Partitioned into plan (immutable once seeded), scratchpad (mutable),
//! execution status, and a routing hint kept field-local so its
//! consume-on-use semantics are visible at the call site.

use super::definition::StepDefinition;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Working,
    InputRequired,
    Completed,
    Failed,
    Canceled,
}

/// The immutable plan derived from a workflow definition at seed time.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub step_ids: Vec<String>,
    pub next_step_ids: Vec<Option<String>>,
    pub start_step_id: String,
    pub steps: Vec<StepDefinition>,
}

#[derive(Debug, Clone)]
pub struct WorkflowRunState {
    // Identity
    pub workflow_id: String,
    pub workflow_run_id: String,
    pub current_step_run_id: String,

    // Plan
    pub plan: RunPlan,

    // Inputs
    pub input: Option<String>,
    pub input_data: Map<String, Value>,

    // Scratchpad — the sole variable source for templates.
    pub workflow_state: Map<String, Value>,

    // Execution status
    pub task_state: TaskState,

    // Routing hint — consumed (set to None) the moment it is read by the router.
    pub go_to_step_id: Option<String>,

    // Conversation flag
    pub is_new_conversation: bool,

    // Output
    pub output: Value,

    // Identity for authz; also forwarded to every tool call.
    pub user_id: String,
    pub user_roles: Vec<String>,
    pub token: String,

    // Diagnostic
    pub event_log: Vec<String>,
}

impl WorkflowRunState {
    pub fn step(&self, step_id: &str) -> Option<&StepDefinition> {
        self.plan.steps.iter().find(|s| s.step_id == step_id)
    }

    pub fn log(&mut self, message: impl Into<String>) {
        self.event_log.push(message.into());
    }

    /// Clear `token`/`user_id` from the scratchpad; called immediately after
    /// a `SYSTEM_ACTION` step resolves its inputs against an augmented view.
    pub fn scrub_identity_from_scratchpad(&mut self) {
        self.workflow_state.remove("token");
        self.workflow_state.remove("user_id");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_state() -> WorkflowRunState {
        WorkflowRunState {
            workflow_id: "wf".into(),
            workflow_run_id: "run-1".into(),
            current_step_run_id: "step-run-1".into(),
            plan: RunPlan {
                step_ids: vec!["A".into()],
                next_step_ids: vec![None],
                start_step_id: "A".into(),
                steps: vec![],
            },
            input: None,
            input_data: Map::new(),
            workflow_state: Map::new(),
            task_state: TaskState::Working,
            go_to_step_id: None,
            is_new_conversation: true,
            output: Value::Null,
            user_id: "u1".into(),
            user_roles: vec!["ops".into()],
            token: "secret-token".into(),
            event_log: vec![],
        }
    }

    #[test]
    fn scrubbing_removes_token_and_user_id_only() {
        let mut state = base_state();
        state.workflow_state.insert("token".into(), Value::String("x".into()));
        state.workflow_state.insert("user_id".into(), Value::String("u1".into()));
        state.workflow_state.insert("foo".into(), Value::String("bar".into()));
        state.scrub_identity_from_scratchpad();
        assert!(!state.workflow_state.contains_key("token"));
        assert!(!state.workflow_state.contains_key("user_id"));
        assert!(state.workflow_state.contains_key("foo"));
    }
}
