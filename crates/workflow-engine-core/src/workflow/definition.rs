//! The read-only shape of a workflow as loaded from the catalogue.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub workflow_id: String,
    pub name: String,
    #[serde(default)]
    pub exit_keywords: HashSet<String>,
    #[serde(default)]
    pub roles: HashSet<String>,
    pub steps: Vec<StepDefinition>,
}

impl WorkflowDefinition {
    /// True if `text` matches an exit keyword, case-insensitively.
    pub fn is_exit_keyword(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.exit_keywords.iter().any(|k| k.to_lowercase() == lower)
    }

    pub fn step(&self, step_id: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    pub step_id: String,
    #[serde(default)]
    pub next_step_id: Option<String>,
    #[serde(default)]
    pub failure_message: Option<String>,
    #[serde(flatten)]
    pub body: StepBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StepBody {
    #[serde(rename = "USER_INPUT")]
    UserInput { user_interaction: UserInteraction },
    #[serde(rename = "SYSTEM_ACTION")]
    SystemAction {
        system_action_details: SystemActionDetails,
    },
    #[serde(rename = "FINAL_RESPONSE")]
    FinalResponse { user_interaction: UserInteraction },
    /// Any type not recognised above. The graph builder treats this as a
    /// system-action with a warning, matching the original's fallback.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInteraction {
    #[serde(default)]
    pub user_message: Option<String>,
    #[serde(default)]
    pub expected_data_key: Vec<String>,
    #[serde(default)]
    pub orchestration_rules: Vec<OrchestrationRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationRule {
    pub condition: String,
    pub go_to_step: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemActionDetails {
    pub name: String,
    #[serde(default)]
    pub inputs: Value,
    #[serde(default)]
    pub error_mapping: ErrorMapping,
    #[serde(default)]
    pub success_mapping: std::collections::HashMap<String, String>,
    #[serde(default)]
    pub output_mapping: std::collections::HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorMapping {
    #[serde(default)]
    pub error_status: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_keyword_match_is_case_insensitive() {
        let def = WorkflowDefinition {
            workflow_id: "wf".into(),
            name: "Test".into(),
            exit_keywords: ["quit".to_string()].into_iter().collect(),
            roles: HashSet::new(),
            steps: vec![],
        };
        assert!(def.is_exit_keyword("QUIT"));
        assert!(def.is_exit_keyword("Quit"));
        assert!(!def.is_exit_keyword("stop"));
    }
}
