//! Postgres-backed `WorkflowStore` (the catalogue's read-through backing
//! store): workflow metadata and its step list are stored as JSON columns
//! and deserialised straight into the core crate's `WorkflowDefinition`.

use async_trait::async_trait;
use diesel::prelude::*;
use serde_json::Value;
use std::collections::HashSet;
use workflow_engine_core::error::WorkflowError;
use workflow_engine_core::workflow::{StepDefinition, WorkflowDefinition};

use crate::catalogue::WorkflowStore;
use super::pool::DbPool;
use super::schema::workflow_definitions::dsl;

#[derive(Queryable)]
struct WorkflowDefinitionRow {
    workflow_id: String,
    name: String,
    exit_keywords: Value,
    roles: Value,
    steps: Value,
}

fn to_definition(row: WorkflowDefinitionRow) -> Result<WorkflowDefinition, WorkflowError> {
    let exit_keywords: HashSet<String> =
        serde_json::from_value(row.exit_keywords).map_err(WorkflowError::from)?;
    let roles: HashSet<String> = serde_json::from_value(row.roles).map_err(WorkflowError::from)?;
    let steps: Vec<StepDefinition> = serde_json::from_value(row.steps).map_err(WorkflowError::from)?;

    Ok(WorkflowDefinition {
        workflow_id: row.workflow_id,
        name: row.name,
        exit_keywords,
        roles,
        steps,
    })
}

pub struct PostgresWorkflowStore {
    pool: DbPool,
}

impl PostgresWorkflowStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowStore for PostgresWorkflowStore {
    async fn load_workflow(&self, workflow_id: &str) -> Result<Option<WorkflowDefinition>, WorkflowError> {
        let mut conn = self.pool.get().map_err(|e| WorkflowError::PersistenceFailure {
            message: format!("failed to acquire db connection: {e}"),
        })?;

        let row: Option<WorkflowDefinitionRow> = dsl::workflow_definitions
            .filter(dsl::workflow_id.eq(workflow_id))
            .select((dsl::workflow_id, dsl::name, dsl::exit_keywords, dsl::roles, dsl::steps))
            .first(&mut conn)
            .optional()
            .map_err(|e| WorkflowError::PersistenceFailure {
                message: format!("workflow lookup failed: {e}"),
            })?;

        row.map(to_definition).transpose()
    }

    async fn load_all_workflows(&self) -> Result<Vec<WorkflowDefinition>, WorkflowError> {
        let mut conn = self.pool.get().map_err(|e| WorkflowError::PersistenceFailure {
            message: format!("failed to acquire db connection: {e}"),
        })?;

        let rows: Vec<WorkflowDefinitionRow> = dsl::workflow_definitions
            .select((dsl::workflow_id, dsl::name, dsl::exit_keywords, dsl::roles, dsl::steps))
            .load(&mut conn)
            .map_err(|e| WorkflowError::PersistenceFailure {
                message: format!("workflow listing failed: {e}"),
            })?;

        rows.into_iter().map(to_definition).collect()
    }
}
