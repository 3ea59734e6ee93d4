//! # Workflow Engine Core
//!
//! The pure logic of the workflow runtime: workflow/step definitions, run
//! state, the template evaluator, the JSON-path helper, the data-driven
//! graph router, and the three step handlers. The tool-client and journal
//! seams are traits here so handlers can be unit-tested with fakes; the
//! concrete Postgres journal lives in `workflow-engine-api` and the
//! concrete HTTP tool client lives in `workflow-engine-mcp`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod journal;
pub mod jsonpath;
pub mod router;
pub mod template;
pub mod tool_client;
pub mod workflow;

pub use error::{Result, WorkflowError};
pub use journal::{InMemoryJournal, Journal, StepRunRow};
pub use template::TemplateEngine;
pub use tool_client::ToolClient;
pub use workflow::{RunPlan, TaskState, WorkflowDefinition, WorkflowRunState};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
