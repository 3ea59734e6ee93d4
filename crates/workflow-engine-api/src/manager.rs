//! Workflow manager (component H): identity resolution, resume probe,
//! definition fetch, plan seeding, graph execution, reply projection.

use chrono::Utc;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use workflow_engine_core::error::WorkflowError;
use workflow_engine_core::handlers;
use workflow_engine_core::journal::{Journal, StepRunRow};
use workflow_engine_core::router;
use workflow_engine_core::template::TemplateEngine;
use workflow_engine_core::tool_client::ToolClient;
use workflow_engine_core::workflow::{plan_from_definition, StepBody, TaskState, WorkflowRunState};

use crate::catalogue::{Catalogue, WorkflowStore};

const IDENTITY_BUDGET: Duration = Duration::from_secs(100);

#[derive(Debug, Clone)]
pub struct ManagerInput {
    pub workflow_id: String,
    pub workflow_run_id: String,
    pub token: String,
    pub input: Option<String>,
    pub input_data: Map<String, Value>,
    pub is_new_conversation: bool,
}

#[derive(Debug, Clone)]
pub struct ManagerOutput {
    pub output: Value,
    pub task_state: TaskState,
    pub status: String,
    pub event_log: Vec<String>,
    pub workflow_id: String,
    pub workflow_name: String,
}

fn task_state_wire(state: TaskState) -> &'static str {
    match state {
        TaskState::Working => "working",
        TaskState::InputRequired => "input-required",
        TaskState::Completed => "completed",
        TaskState::Failed => "failed",
        TaskState::Canceled => "canceled",
    }
}

pub struct WorkflowManager<S: WorkflowStore> {
    catalogue: Catalogue<S>,
    journal: Box<dyn Journal>,
    tool_client: Box<dyn ToolClient>,
    template_engine: TemplateEngine,
}

impl<S: WorkflowStore> WorkflowManager<S> {
    pub fn new(catalogue: Catalogue<S>, journal: Box<dyn Journal>, tool_client: Box<dyn ToolClient>) -> Self {
        Self {
            catalogue,
            journal,
            tool_client,
            template_engine: TemplateEngine::new(),
        }
    }

    async fn resolve_identity(&self, token: &str) -> Result<(String, Vec<String>), WorkflowError> {
        let call = self.tool_client.call("get_user_info", Value::Null, token);
        let reply = tokio::time::timeout(IDENTITY_BUDGET, call)
            .await
            .map_err(|_| WorkflowError::ToolTimeout {
                tool_name: "get_user_info".to_string(),
                elapsed_secs: IDENTITY_BUDGET.as_secs(),
            })??;

        let data = &reply["output"]["data"];
        let user_id = data["userId"].as_str().unwrap_or_default().to_string();
        let roles = data["roles"]
            .as_array()
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();
        Ok((user_id, roles))
    }

    pub async fn handle(&self, input: ManagerInput) -> Result<ManagerOutput, WorkflowError> {
        info!(workflow_run_id = %input.workflow_run_id, workflow_id = %input.workflow_id, "processing workflow request");

        let (user_id, roles) = self.resolve_identity(&input.token).await?;

        let resume_row = self.journal.find_input_required(&input.workflow_run_id).await?;

        let (workflow_id, start_step_override, snapshot, current_step_run_id, is_new_conversation) =
            match &resume_row {
                Some(row) => (
                    row.workflow_id.clone(),
                    Some(row.step_id.clone()),
                    row.workflow_state.clone(),
                    row.step_run_id.clone(),
                    false,
                ),
                None => (
                    input.workflow_id.clone(),
                    None,
                    Map::new(),
                    Uuid::new_v4().to_string(),
                    input.is_new_conversation,
                ),
            };

        let definition = self
            .catalogue
            .get_steps_by_workflow_id(&workflow_id, &roles)
            .await?
            .ok_or_else(|| WorkflowError::WorkflowNotFound {
                workflow_id: workflow_id.clone(),
            })?;

        let plan = plan_from_definition(&definition, start_step_override)?;

        let mut state = WorkflowRunState {
            workflow_id: workflow_id.clone(),
            workflow_run_id: input.workflow_run_id.clone(),
            current_step_run_id,
            plan,
            input: input.input.clone(),
            input_data: input.input_data.clone(),
            workflow_state: snapshot,
            task_state: TaskState::Working,
            go_to_step_id: None,
            is_new_conversation,
            output: Value::Null,
            user_id,
            user_roles: roles,
            token: input.token.clone(),
            event_log: Vec::new(),
        };

        let mut current_step_id = state.plan.start_step_id.clone();

        loop {
            let step = state
                .step(&current_step_id)
                .cloned()
                .ok_or_else(|| WorkflowError::DefinitionInvalid {
                    message: format!("step {current_step_id} not found in plan"),
                })?;

            let started_at = Utc::now();

            match &step.body {
                StepBody::UserInput { user_interaction } => {
                    let interaction = user_interaction.clone();
                    handlers::handle_user_input(&definition, &step, &interaction, &mut state, &self.template_engine)?;
                }
                StepBody::FinalResponse { user_interaction } => {
                    handlers::handle_final_response(user_interaction, &mut state, &self.template_engine)?;
                }
                StepBody::SystemAction { .. } => {
                    handlers::handle_system_action(&step, &mut state, self.tool_client.as_ref()).await?;
                }
                StepBody::Unknown => {
                    state.log(format!("step {current_step_id}: unknown step type, defaulting to no-op completion"));
                    state.task_state = TaskState::Completed;
                }
            }

            let journal_row = StepRunRow {
                workflow_run_id: state.workflow_run_id.clone(),
                step_run_id: state.current_step_run_id.clone(),
                workflow_id: state.workflow_id.clone(),
                step_id: current_step_id.clone(),
                started_at,
                completed_at: Some(Utc::now()),
                status: state.task_state,
                workflow_state: state.workflow_state.clone(),
                success_response: if state.task_state == TaskState::Completed {
                    Some(state.output.clone())
                } else {
                    None
                },
                error_response: if matches!(state.task_state, TaskState::Failed | TaskState::Canceled) {
                    Some(state.output.clone())
                } else {
                    None
                },
            };
            self.journal.upsert(journal_row).await?;

            match router::next_step(&current_step_id, &mut state) {
                Some(next) => {
                    current_step_id = next;
                    state.current_step_run_id = Uuid::new_v4().to_string();
                }
                None => break,
            }
        }

        Ok(ManagerOutput {
            output: state.output,
            task_state: state.task_state,
            status: task_state_wire(state.task_state).to_string(),
            event_log: state.event_log,
            workflow_id: definition.workflow_id,
            workflow_name: definition.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use workflow_engine_core::journal::InMemoryJournal;
    use workflow_engine_core::workflow::{
        ErrorMapping, OrchestrationRule, StepBody, StepDefinition, SystemActionDetails, UserInteraction,
        WorkflowDefinition,
    };

    struct FakeStore(WorkflowDefinition);

    #[async_trait]
    impl WorkflowStore for FakeStore {
        async fn load_workflow(&self, workflow_id: &str) -> Result<Option<WorkflowDefinition>, WorkflowError> {
            if workflow_id == self.0.workflow_id {
                Ok(Some(self.0.clone()))
            } else {
                Ok(None)
            }
        }

        async fn load_all_workflows(&self) -> Result<Vec<WorkflowDefinition>, WorkflowError> {
            Ok(vec![self.0.clone()])
        }
    }

    struct FakeToolClient {
        tool_reply: Option<Value>,
        hang: bool,
    }

    const FAKE_TOOL_BUDGET: Duration = Duration::from_secs(45);

    #[async_trait]
    impl ToolClient for FakeToolClient {
        async fn call(&self, tool_name: &str, _params: Value, _token: &str) -> Result<Value, WorkflowError> {
            if tool_name == "get_user_info" {
                return Ok(serde_json::json!({
                    "output": {"data": {"userId": "u1", "roles": ["ops"]}}
                }));
            }
            if self.hang {
                return tokio::time::timeout(FAKE_TOOL_BUDGET, std::future::pending::<()>())
                    .await
                    .map(|_| unreachable!())
                    .map_err(|_| WorkflowError::ToolTimeout {
                        tool_name: tool_name.to_string(),
                        elapsed_secs: FAKE_TOOL_BUDGET.as_secs(),
                    });
            }
            self.tool_reply
                .clone()
                .ok_or_else(|| WorkflowError::MCPError {
                    tool_name: tool_name.to_string(),
                    message: "no reply configured".to_string(),
                })
        }
    }

    fn two_step_workflow(exit_keywords: &[&str]) -> WorkflowDefinition {
        WorkflowDefinition {
            workflow_id: "wf-1".into(),
            name: "Greeter".into(),
            exit_keywords: exit_keywords.iter().map(|s| s.to_string()).collect(),
            roles: ["ops".to_string()].into_iter().collect(),
            steps: vec![
                StepDefinition {
                    step_id: "A".into(),
                    next_step_id: Some("B".into()),
                    failure_message: None,
                    body: StepBody::UserInput {
                        user_interaction: UserInteraction {
                            user_message: Some("hello there".into()),
                            expected_data_key: vec!["expected_key".into()],
                            orchestration_rules: vec![],
                        },
                    },
                },
                StepDefinition {
                    step_id: "B".into(),
                    next_step_id: None,
                    failure_message: None,
                    body: StepBody::FinalResponse {
                        user_interaction: UserInteraction {
                            user_message: Some("done".into()),
                            expected_data_key: vec![],
                            orchestration_rules: vec![],
                        },
                    },
                },
            ],
        }
    }

    fn manager(
        def: WorkflowDefinition,
        journal: InMemoryJournal,
        tool_reply: Option<Value>,
        hang: bool,
    ) -> WorkflowManager<FakeStore> {
        WorkflowManager::new(
            Catalogue::new(FakeStore(def)),
            Box::new(journal),
            Box::new(FakeToolClient { tool_reply, hang }),
        )
    }

    #[tokio::test]
    async fn s1_happy_path_with_terminal_prompt() {
        let journal = InMemoryJournal::new();
        let mgr = manager(two_step_workflow(&["quit"]), journal, None, false);

        let first = mgr
            .handle(ManagerInput {
                workflow_id: "wf-1".into(),
                workflow_run_id: "run-1".into(),
                token: "tok".into(),
                input: Some("hello".into()),
                input_data: Map::new(),
                is_new_conversation: true,
            })
            .await
            .unwrap();
        assert_eq!(first.task_state, TaskState::InputRequired);
        assert_eq!(first.output["summary"], "hello there");

        let mut input_data = Map::new();
        input_data.insert("expected_key".into(), Value::String("v".into()));
        let second = mgr
            .handle(ManagerInput {
                workflow_id: "wf-1".into(),
                workflow_run_id: "run-1".into(),
                token: "tok".into(),
                input: Some("anything".into()),
                input_data,
                is_new_conversation: false,
            })
            .await
            .unwrap();
        assert_eq!(second.task_state, TaskState::Completed);
        assert_eq!(second.output["summary"], "done");
    }

    #[tokio::test]
    async fn s2_exit_keyword_cancels_resumed_run() {
        let journal = InMemoryJournal::new();
        let mgr = manager(two_step_workflow(&["quit"]), journal, None, false);

        mgr.handle(ManagerInput {
            workflow_id: "wf-1".into(),
            workflow_run_id: "run-1".into(),
            token: "tok".into(),
            input: Some("hello".into()),
            input_data: Map::new(),
            is_new_conversation: true,
        })
        .await
        .unwrap();

        let second = mgr
            .handle(ManagerInput {
                workflow_id: "wf-1".into(),
                workflow_run_id: "run-1".into(),
                token: "tok".into(),
                input: Some("quit".into()),
                input_data: Map::new(),
                is_new_conversation: false,
            })
            .await
            .unwrap();
        assert_eq!(second.task_state, TaskState::Canceled);
        assert_eq!(second.output["summary"], "Workflow wf-1 (Greeter) terminated.");
    }

    #[tokio::test]
    async fn s3_confirm_decline_cancels() {
        let mut def = two_step_workflow(&[]);
        if let StepBody::UserInput { user_interaction } = &mut def.steps[0].body {
            user_interaction.expected_data_key = vec!["confirm_action".into()];
        }
        let journal = InMemoryJournal::new();
        let mgr = manager(def, journal, None, false);

        mgr.handle(ManagerInput {
            workflow_id: "wf-1".into(),
            workflow_run_id: "run-1".into(),
            token: "tok".into(),
            input: Some("hello".into()),
            input_data: Map::new(),
            is_new_conversation: true,
        })
        .await
        .unwrap();

        let second = mgr
            .handle(ManagerInput {
                workflow_id: "wf-1".into(),
                workflow_run_id: "run-1".into(),
                token: "tok".into(),
                input: Some("no".into()),
                input_data: Map::new(),
                is_new_conversation: false,
            })
            .await
            .unwrap();
        assert_eq!(second.task_state, TaskState::Canceled);
        assert_eq!(second.output["summary"], "Action cancelled by user");
    }

    #[tokio::test]
    async fn s4_orchestration_rule_routes_and_clears_variable() {
        let mut def = two_step_workflow(&[]);
        def.steps.push(StepDefinition {
            step_id: "C".into(),
            next_step_id: None,
            failure_message: None,
            body: StepBody::FinalResponse {
                user_interaction: UserInteraction {
                    user_message: Some("routed to C".into()),
                    expected_data_key: vec![],
                    orchestration_rules: vec![],
                },
            },
        });
        if let StepBody::UserInput { user_interaction } = &mut def.steps[0].body {
            user_interaction.expected_data_key = vec!["selected".into()];
            user_interaction.orchestration_rules = vec![OrchestrationRule {
                condition: "{{ selected }} == 'x'".into(),
                go_to_step: "C".into(),
            }];
        }

        let journal = InMemoryJournal::new();
        let mgr = manager(def, journal, None, false);

        mgr.handle(ManagerInput {
            workflow_id: "wf-1".into(),
            workflow_run_id: "run-1".into(),
            token: "tok".into(),
            input: Some("hello".into()),
            input_data: Map::new(),
            is_new_conversation: true,
        })
        .await
        .unwrap();

        let mut input_data = Map::new();
        input_data.insert("selected".into(), Value::String("x".into()));
        let second = mgr
            .handle(ManagerInput {
                workflow_id: "wf-1".into(),
                workflow_run_id: "run-1".into(),
                token: "tok".into(),
                input: None,
                input_data,
                is_new_conversation: false,
            })
            .await
            .unwrap();
        assert_eq!(second.task_state, TaskState::Completed);
        assert_eq!(second.output["summary"], "routed to C");
    }

    fn system_action_workflow() -> WorkflowDefinition {
        let mut inputs = Map::new();
        inputs.insert("q".into(), Value::String("$.foo".into()));
        let mut output_mapping = HashMap::new();
        output_mapping.insert("answer".to_string(), "$.r".to_string());

        WorkflowDefinition {
            workflow_id: "wf-2".into(),
            name: "Lookup".into(),
            exit_keywords: HashSet::new(),
            roles: ["ops".to_string()].into_iter().collect(),
            steps: vec![
                StepDefinition {
                    step_id: "S".into(),
                    next_step_id: Some("F".into()),
                    failure_message: None,
                    body: StepBody::SystemAction {
                        system_action_details: SystemActionDetails {
                            name: "lookup".into(),
                            inputs: Value::Object(inputs),
                            error_mapping: ErrorMapping::default(),
                            success_mapping: HashMap::new(),
                            output_mapping,
                        },
                    },
                },
                StepDefinition {
                    step_id: "F".into(),
                    next_step_id: None,
                    failure_message: None,
                    body: StepBody::FinalResponse {
                        user_interaction: UserInteraction {
                            user_message: Some("{{ answer }}".into()),
                            expected_data_key: vec![],
                            orchestration_rules: vec![],
                        },
                    },
                },
            ],
        }
    }

    #[tokio::test]
    async fn s5_system_action_maps_output_and_completes() {
        let journal = InMemoryJournal::new();
        let reply = serde_json::json!({"r": "forty-two"});
        let mgr = manager(system_action_workflow(), journal, Some(reply), false);

        let result = mgr
            .handle(ManagerInput {
                workflow_id: "wf-2".into(),
                workflow_run_id: "run-2".into(),
                token: "tok".into(),
                input: None,
                input_data: Map::new(),
                is_new_conversation: true,
            })
            .await
            .unwrap();
        assert_eq!(result.task_state, TaskState::Completed);
        assert_eq!(result.output["summary"], "forty-two");
    }

    #[tokio::test(start_paused = true)]
    async fn s6_tool_timeout_fails_run_and_writes_journal_row() {
        let journal = InMemoryJournal::new();
        let mgr = manager(system_action_workflow(), journal, None, true);

        let handle = tokio::spawn(async move {
            mgr.handle(ManagerInput {
                workflow_id: "wf-2".into(),
                workflow_run_id: "run-3".into(),
                token: "tok".into(),
                input: None,
                input_data: Map::new(),
                is_new_conversation: true,
            })
            .await
        });

        tokio::time::advance(Duration::from_secs(46)).await;
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.task_state, TaskState::Failed);
        assert_eq!(result.output["summary"], "Tool execution timeout: lookup");
    }
}
