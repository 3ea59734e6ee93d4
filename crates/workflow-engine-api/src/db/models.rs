use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

use super::schema::workflow_run;

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = workflow_run)]
pub struct WorkflowRunRow {
    pub workflow_run_id: String,
    pub step_run_id: String,
    pub workflow_id: String,
    pub step_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: String,
    pub workflow_state: Value,
    pub success_response: Option<Value>,
    pub error_response: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}
