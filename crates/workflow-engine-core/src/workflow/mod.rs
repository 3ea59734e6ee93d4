pub mod definition;
pub mod state;

pub use definition::{
    ErrorMapping, OrchestrationRule, StepBody, StepDefinition, SystemActionDetails, UserInteraction,
    WorkflowDefinition,
};
pub use state::{RunPlan, TaskState, WorkflowRunState};

/// Derive the immutable plan from a loaded definition. `start_step_id` is
/// the unique step-id that is not referenced as any step's `next_step_id`
/// when starting fresh; callers resuming a run override it with the step-id
/// from the journal's pending row.
pub fn plan_from_definition(
    def: &WorkflowDefinition,
    start_step_id_override: Option<String>,
) -> Result<RunPlan, crate::error::WorkflowError> {
    let step_ids: Vec<String> = def.steps.iter().map(|s| s.step_id.clone()).collect();
    let next_step_ids: Vec<Option<String>> = def.steps.iter().map(|s| s.next_step_id.clone()).collect();

    let start_step_id = match start_step_id_override {
        Some(id) => id,
        None => {
            let referenced: std::collections::HashSet<&str> =
                next_step_ids.iter().flatten().map(String::as_str).collect();
            step_ids
                .iter()
                .find(|id| !referenced.contains(id.as_str()))
                .cloned()
                .ok_or_else(|| crate::error::WorkflowError::DefinitionInvalid {
                    message: "no unique start step: every step is referenced as a next_step_id".to_string(),
                })?
        }
    };

    Ok(RunPlan {
        step_ids,
        next_step_ids,
        start_step_id,
        steps: def.steps.clone(),
    })
}
