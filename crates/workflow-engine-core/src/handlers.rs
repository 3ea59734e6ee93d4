//! Step handlers (component F). Each handler implements the uniform
//! `(step-def, state) -> state` contract; the journal wrapper that turns
//! each invocation into exactly one row transition lives in the manager
//! (component H), not here, so these functions stay pure enough to test
//! with an in-memory journal fake and a fake tool client.

use crate::error::WorkflowError;
use crate::jsonpath;
use crate::template::TemplateEngine;
use crate::tool_client::ToolClient;
use crate::workflow::definition::{StepBody, StepDefinition, UserInteraction, WorkflowDefinition};
use crate::workflow::state::{TaskState, WorkflowRunState};
use serde_json::{Map, Value};

/// Parse `rendered` as JSON; on success it becomes the output verbatim, on
/// failure it is wrapped as `{summary: rendered}`.
fn render_to_output(rendered: String) -> Value {
    match serde_json::from_str::<Value>(&rendered) {
        Ok(v) => v,
        Err(_) => {
            let mut obj = Map::new();
            obj.insert("summary".to_string(), Value::String(rendered));
            Value::Object(obj)
        }
    }
}

fn summary(text: impl Into<String>) -> Value {
    let mut obj = Map::new();
    obj.insert("summary".to_string(), Value::String(text.into()));
    Value::Object(obj)
}

pub fn handle_user_input(
    workflow: &WorkflowDefinition,
    step: &StepDefinition,
    interaction: &UserInteraction,
    state: &mut WorkflowRunState,
    engine: &TemplateEngine,
) -> Result<(), WorkflowError> {
    let is_resume =
        !state.is_new_conversation && step.step_id == state.plan.start_step_id && state.go_to_step_id.is_none();

    if is_resume {
        handle_resume(workflow, interaction, state, engine)
    } else {
        handle_prompt(interaction, state, engine)
    }
}

fn handle_resume(
    workflow: &WorkflowDefinition,
    interaction: &UserInteraction,
    state: &mut WorkflowRunState,
    engine: &TemplateEngine,
) -> Result<(), WorkflowError> {
    if let Some(text) = state.input.clone() {
        if workflow.is_exit_keyword(&text) {
            state.task_state = TaskState::Canceled;
            state.output = summary(format!("Workflow {} ({}) terminated.", workflow.workflow_id, workflow.name));
            return Ok(());
        }
    }

    // Ingest the user's reply into the scratchpad.
    if !state.input_data.is_empty() && !interaction.expected_data_key.is_empty() {
        for key in &interaction.expected_data_key {
            if let Some(v) = state.input_data.get(key) {
                state.workflow_state.insert(key.clone(), v.clone());
            }
        }
    } else if let (Some(text), Some(first_key)) = (state.input.clone(), interaction.expected_data_key.first()) {
        state.workflow_state.insert(first_key.clone(), Value::String(text));
    }

    if let Some(Value::String(v)) = state.workflow_state.get("confirm_action") {
        if v.eq_ignore_ascii_case("no") || v.eq_ignore_ascii_case("n") {
            state.task_state = TaskState::Canceled;
            state.output = summary("Action cancelled by user");
            return Ok(());
        }
    }

    let mut last_evaluated_vars: Vec<String> = Vec::new();
    let mut matched = false;
    for rule in &interaction.orchestration_rules {
        let free_vars: Vec<String> = TemplateEngine::free_variables(&rule.condition).into_iter().collect();
        let missing = free_vars
            .iter()
            .any(|v| !state.workflow_state.contains_key(v));
        if missing {
            state.log(format!("rule for {} skipped: missing vars", rule.go_to_step));
            continue;
        }
        last_evaluated_vars = free_vars;
        match engine.evaluate_condition("", &rule.condition, &state.workflow_state) {
            Ok(true) => {
                state.go_to_step_id = Some(rule.go_to_step.clone());
                matched = true;
                break;
            }
            Ok(false) => continue,
            Err(e) => {
                state.task_state = TaskState::Failed;
                state.output = summary(e.to_string());
                return Ok(());
            }
        }
    }
    let _ = matched;

    for var in &last_evaluated_vars {
        state.workflow_state.insert(var.clone(), Value::Null);
        state.input_data.insert(var.clone(), Value::Null);
    }

    state.task_state = TaskState::Completed;
    Ok(())
}

fn handle_prompt(
    interaction: &UserInteraction,
    state: &mut WorkflowRunState,
    engine: &TemplateEngine,
) -> Result<(), WorkflowError> {
    state.go_to_step_id = None;
    let template = interaction.user_message.clone().unwrap_or_default();
    let rendered = engine.render(&template, &state.workflow_state)?;
    state.output = render_to_output(rendered);
    state.task_state = TaskState::InputRequired;
    Ok(())
}

pub fn handle_final_response(
    interaction: &UserInteraction,
    state: &mut WorkflowRunState,
    engine: &TemplateEngine,
) -> Result<(), WorkflowError> {
    state.go_to_step_id = None;
    match &interaction.user_message {
        None => {
            state.task_state = TaskState::Failed;
        }
        Some(template) => {
            let rendered = engine.render(template, &state.workflow_state)?;
            state.output = render_to_output(rendered);
            state.task_state = TaskState::Completed;
        }
    }
    Ok(())
}

pub async fn handle_system_action(
    step: &StepDefinition,
    state: &mut WorkflowRunState,
    tool_client: &dyn ToolClient,
) -> Result<(), WorkflowError> {
    let details = match &step.body {
        StepBody::SystemAction { system_action_details } => system_action_details,
        _ => {
            return Err(WorkflowError::DefinitionInvalid {
                message: format!("step {} is not a SYSTEM_ACTION", step.step_id),
            })
        }
    };

    state
        .workflow_state
        .insert("token".to_string(), Value::String(state.token.clone()));
    state
        .workflow_state
        .insert("user_id".to_string(), Value::String(state.user_id.clone()));
    let resolved = jsonpath::resolve(&details.inputs, &Value::Object(state.workflow_state.clone()));
    state.scrub_identity_from_scratchpad();

    let reply = match tool_client.call(&details.name, resolved, &state.token).await {
        Ok(reply) => reply,
        Err(WorkflowError::ToolTimeout { .. }) => {
            state.task_state = TaskState::Failed;
            state.output = summary(format!("Tool execution timeout: {}", details.name));
            return Ok(());
        }
        Err(e) => {
            state.task_state = TaskState::Failed;
            state.output = summary(e.to_string());
            return Ok(());
        }
    };

    if let Some(status_path) = &details.error_mapping.error_status {
        let status = jsonpath::extract(&reply, status_path);
        if status.as_str() == Some("error") {
            let message = details
                .error_mapping
                .error_message
                .as_ref()
                .map(|p| jsonpath::extract(&reply, p))
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_else(|| "tool reported an error".to_string());
            state.task_state = TaskState::Failed;
            state.output = summary(message);
            return Ok(());
        }
    }

    for (key, path) in &details.success_mapping {
        let value = jsonpath::extract(&reply, path);
        let inputs_bag = state
            .workflow_state
            .entry("inputs".to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(bag) = inputs_bag {
            bag.insert(key.clone(), value);
        }
    }

    for (key, path) in &details.output_mapping {
        let value = jsonpath::extract(&reply, path);
        let stored = match value {
            Value::String(s) => {
                let escaped = serde_json::to_string(&s).unwrap_or(s.clone());
                let inner = escaped
                    .strip_prefix('"')
                    .and_then(|s| s.strip_suffix('"'))
                    .unwrap_or(&escaped)
                    .to_string();
                Value::String(inner)
            }
            other => other,
        };
        state.workflow_state.insert(key.clone(), stored);
    }

    state.task_state = TaskState::Completed;
    Ok(())
}
