//! The tool-client seam (component C). The concrete HTTP implementation
//! lives in `workflow-engine-mcp`; this crate only needs the contract so
//! step handlers can be written and tested against a fake.

use crate::error::WorkflowError;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait ToolClient: Send + Sync {
    /// Open a session, invoke `tool_name` with `params`, parse the reply,
    /// close the session — all scoped to this one call under a hard
    /// wall-clock budget enforced by the implementation.
    async fn call(&self, tool_name: &str, params: Value, token: &str) -> Result<Value, WorkflowError>;
}
