//! The step-run journal seam (component E). The concrete Postgres/diesel
//! implementation lives in `workflow-engine-api`; this crate holds the
//! contract plus an in-memory fake used by handler/graph unit tests.

use crate::error::WorkflowError;
use crate::workflow::state::TaskState;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct StepRunRow {
    pub workflow_run_id: String,
    pub step_run_id: String,
    pub workflow_id: String,
    pub step_id: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub status: TaskState,
    pub workflow_state: Map<String, Value>,
    pub success_response: Option<Value>,
    pub error_response: Option<Value>,
}

#[async_trait]
pub trait Journal: Send + Sync {
    /// Upsert on `step_run_id`: update the mutable columns on conflict. Both
    /// "begin step" and "finish step" writes go through this one primitive.
    async fn upsert(&self, row: StepRunRow) -> Result<(), WorkflowError>;

    /// The most recent `input-required` row for `workflow_run_id`, if any.
    async fn find_input_required(
        &self,
        workflow_run_id: &str,
    ) -> Result<Option<StepRunRow>, WorkflowError>;
}

/// In-memory fake journal for unit-testing handlers and the graph runtime
/// without a database.
#[derive(Default)]
pub struct InMemoryJournal {
    rows: Mutex<HashMap<String, StepRunRow>>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<StepRunRow> {
        self.rows.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl Journal for InMemoryJournal {
    async fn upsert(&self, row: StepRunRow) -> Result<(), WorkflowError> {
        self.rows.lock().unwrap().insert(row.step_run_id.clone(), row);
        Ok(())
    }

    async fn find_input_required(
        &self,
        workflow_run_id: &str,
    ) -> Result<Option<StepRunRow>, WorkflowError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .filter(|r| r.workflow_run_id == workflow_run_id && r.status == TaskState::InputRequired)
            .max_by_key(|r| r.started_at)
            .cloned())
    }
}
