//! Postgres-backed implementation of the core crate's `Journal` trait
//! (component E), upserting on `step_run_id` via diesel's
//! `ON CONFLICT ... DO UPDATE`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::upsert::excluded;
use serde_json::{Map, Value};
use workflow_engine_core::error::WorkflowError;
use workflow_engine_core::journal::{Journal, StepRunRow};
use workflow_engine_core::workflow::TaskState;

use super::models::WorkflowRunRow;
use super::pool::DbPool;
use super::schema::workflow_run::dsl;

fn task_state_to_str(state: TaskState) -> &'static str {
    match state {
        TaskState::Working => "working",
        TaskState::InputRequired => "input-required",
        TaskState::Completed => "completed",
        TaskState::Failed => "failed",
        TaskState::Canceled => "canceled",
    }
}

fn task_state_from_str(raw: &str) -> Result<TaskState, WorkflowError> {
    match raw {
        "working" => Ok(TaskState::Working),
        "input-required" => Ok(TaskState::InputRequired),
        "completed" => Ok(TaskState::Completed),
        "failed" => Ok(TaskState::Failed),
        "canceled" => Ok(TaskState::Canceled),
        other => Err(WorkflowError::PersistenceFailure {
            message: format!("unknown task-state in journal row: {other}"),
        }),
    }
}

fn row_to_db(row: StepRunRow) -> WorkflowRunRow {
    let now = row.completed_at.unwrap_or(row.started_at);
    WorkflowRunRow {
        workflow_run_id: row.workflow_run_id,
        step_run_id: row.step_run_id,
        workflow_id: row.workflow_id,
        step_id: row.step_id,
        started_at: row.started_at,
        completed_at: row.completed_at,
        status: task_state_to_str(row.status).to_string(),
        workflow_state: Value::Object(row.workflow_state),
        success_response: row.success_response,
        error_response: row.error_response,
        created_at: row.started_at,
        updated_at: now,
        created_by: None,
        updated_by: None,
    }
}

fn db_to_row(db: WorkflowRunRow) -> Result<StepRunRow, WorkflowError> {
    let workflow_state = match db.workflow_state {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Ok(StepRunRow {
        workflow_run_id: db.workflow_run_id,
        step_run_id: db.step_run_id,
        workflow_id: db.workflow_id,
        step_id: db.step_id,
        started_at: db.started_at,
        completed_at: db.completed_at,
        status: task_state_from_str(&db.status)?,
        workflow_state,
        success_response: db.success_response,
        error_response: db.error_response,
    })
}

pub struct PostgresJournal {
    pool: DbPool,
}

impl PostgresJournal {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Journal for PostgresJournal {
    async fn upsert(&self, row: StepRunRow) -> Result<(), WorkflowError> {
        let db_row = row_to_db(row);
        let mut conn = self.pool.get().map_err(|e| WorkflowError::PersistenceFailure {
            message: format!("failed to acquire db connection: {e}"),
        })?;

        diesel::insert_into(dsl::workflow_run)
            .values(&db_row)
            .on_conflict(dsl::step_run_id)
            .do_update()
            .set((
                dsl::completed_at.eq(excluded(dsl::completed_at)),
                dsl::status.eq(excluded(dsl::status)),
                dsl::workflow_state.eq(excluded(dsl::workflow_state)),
                dsl::success_response.eq(excluded(dsl::success_response)),
                dsl::error_response.eq(excluded(dsl::error_response)),
                dsl::updated_at.eq(excluded(dsl::updated_at)),
            ))
            .execute(&mut conn)
            .map_err(|e| WorkflowError::PersistenceFailure {
                message: format!("journal upsert failed: {e}"),
            })?;
        Ok(())
    }

    async fn find_input_required(&self, workflow_run_id: &str) -> Result<Option<StepRunRow>, WorkflowError> {
        let mut conn = self.pool.get().map_err(|e| WorkflowError::PersistenceFailure {
            message: format!("failed to acquire db connection: {e}"),
        })?;

        let found: Option<WorkflowRunRow> = dsl::workflow_run
            .filter(dsl::workflow_run_id.eq(workflow_run_id))
            .filter(dsl::status.eq("input-required"))
            .order(dsl::started_at.desc())
            .first(&mut conn)
            .optional()
            .map_err(|e| WorkflowError::PersistenceFailure {
                message: format!("journal lookup failed: {e}"),
            })?;

        found.map(db_to_row).transpose()
    }
}
