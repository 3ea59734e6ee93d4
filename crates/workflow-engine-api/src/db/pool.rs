use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use workflow_engine_core::config::RuntimeConfig;
use workflow_engine_core::error::WorkflowError;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<PgConnection>>;

pub fn build_pool(config: &RuntimeConfig) -> Result<DbPool, WorkflowError> {
    let url = format!(
        "postgres://{}:{}@{}:{}/{}",
        config.db_user, config.db_password, config.db_host, config.db_port, config.db_name
    );
    let manager = ConnectionManager::<PgConnection>::new(url);
    Pool::builder()
        .build(manager)
        .map_err(|e| WorkflowError::ConfigurationError {
            message: format!("failed to build database pool: {e}"),
        })
}
