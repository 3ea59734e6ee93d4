//! Error taxonomy for the workflow runtime.
//!
//! Every failure in the system is a variant of [`WorkflowError`]. `Display`
//! drives the text written into a run's `output.summary` on failure, so this
//! is the one place user-facing failure text gets produced.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkflowError>;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("caller is not authorised to access workflow {workflow_id}")]
    Unauthorised { workflow_id: String },

    #[error("workflow {workflow_id} not found")]
    WorkflowNotFound { workflow_id: String },

    #[error("workflow definition invalid: {message}")]
    DefinitionInvalid { message: String },

    #[error("template {template} references undeclared variables: {missing:?}")]
    InputMissingVars {
        template: String,
        missing: Vec<String>,
    },

    #[error("condition evaluation failed for step {step_id}: {message}")]
    ConditionEvalFailed { step_id: String, message: String },

    #[error("tool call to {tool_name} timed out after {elapsed_secs}s")]
    ToolTimeout {
        tool_name: String,
        elapsed_secs: u64,
    },

    #[error("transport error calling tool {tool_name}: {message}")]
    MCPTransportError { tool_name: String, message: String },

    #[error("tool server protocol error: {message}")]
    MCPProtocolError { message: String },

    #[error("tool {tool_name} returned an error: {message}")]
    MCPError { tool_name: String, message: String },

    #[error("failed to persist run state: {message}")]
    PersistenceFailure { message: String },

    #[error("transport cancelled: {message}")]
    TransportCancel { message: String },

    #[error("validation error: {message}")]
    ValidationError { message: String },

    #[error("configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("serialization error: {message}")]
    SerializationError { message: String },

    #[error("database error: {message}")]
    DatabaseError { message: String },
}

impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        WorkflowError::SerializationError {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for WorkflowError {
    fn from(err: reqwest::Error) -> Self {
        WorkflowError::MCPTransportError {
            tool_name: err.url().map(|u| u.to_string()).unwrap_or_default(),
            message: err.to_string(),
        }
    }
}

impl From<diesel::result::Error> for WorkflowError {
    fn from(err: diesel::result::Error) -> Self {
        WorkflowError::DatabaseError {
            message: err.to_string(),
        }
    }
}
