pub mod journal;
pub mod models;
pub mod pool;
pub mod schema;
pub mod tool_registry;
pub mod workflow_store;

pub use journal::PostgresJournal;
pub use pool::{build_pool, DbConnection, DbPool};
pub use tool_registry::ToolRegistry;
pub use workflow_store::PostgresWorkflowStore;

use workflow_engine_core::error::WorkflowError;

/// Reads `agent_config_store` rows for `app_name`, for merging into
/// `RuntimeConfig::bootstrap`. A read failure is tolerated at boot the
/// same way an unknown key is tolerated: an empty row set, not a fatal
/// error, since every field it can set already has a default.
pub fn load_agent_config_rows(pool: &DbPool, app_name: &str) -> Result<Vec<(String, String)>, WorkflowError> {
    use diesel::prelude::*;
    use schema::agent_config_store::dsl;

    let mut conn = pool.get().map_err(|e| WorkflowError::PersistenceFailure {
        message: format!("failed to acquire db connection: {e}"),
    })?;

    dsl::agent_config_store
        .filter(dsl::agent_id.eq(app_name))
        .select((dsl::key, dsl::value))
        .load(&mut conn)
        .map_err(|e| WorkflowError::PersistenceFailure {
            message: format!("agent config load failed: {e}"),
        })
}
