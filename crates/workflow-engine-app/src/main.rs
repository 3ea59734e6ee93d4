mod config;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use dotenvy::dotenv;
use tracing::info;

use config::EnvSecretSource;
use workflow_engine_api::api;
use workflow_engine_api::db::{self, PostgresJournal, PostgresWorkflowStore};
use workflow_engine_api::{Catalogue, WorkflowManager};
use workflow_engine_core::config::RuntimeConfig;
use workflow_engine_mcp::HttpMcpClient;

fn init_logging() {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    init_logging();

    let secrets = EnvSecretSource;

    // First pass: env + secrets only, enough to open a database connection.
    let bootstrap_config = RuntimeConfig::bootstrap(&secrets, &[])
        .map_err(|e| std::io::Error::other(format!("configuration bootstrap failed: {e}")))?;
    let pool = db::build_pool(&bootstrap_config).map_err(|e| std::io::Error::other(e.to_string()))?;

    let agent_config_rows = db::load_agent_config_rows(&pool, &bootstrap_config.app_name).unwrap_or_default();
    let config = RuntimeConfig::bootstrap(&secrets, &agent_config_rows)
        .map_err(|e| std::io::Error::other(format!("configuration bootstrap failed: {e}")))?;

    info!(app_name = %config.app_name, "starting workflow runtime");

    let tool_client_url = config.mcp_server_url.clone().unwrap_or_default();
    let tool_client = Box::new(HttpMcpClient::new(tool_client_url));
    let journal = Box::new(PostgresJournal::new(pool.clone()));
    let store = PostgresWorkflowStore::new(pool.clone());
    let catalogue = Catalogue::new(store);
    let manager = web::Data::new(WorkflowManager::new(catalogue, journal, tool_client));

    let bind_addr = format!("{}:{}", config.host, config.port);
    info!(bind_addr = %bind_addr, "binding http server");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(manager.clone())
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .route("/health", web::get().to(api::health))
            .route("/a2a/message", web::post().to(api::handle_message::<PostgresWorkflowStore>))
            .route("/a2a/cancel", web::post().to(api::cancel))
    })
    .bind(bind_addr)?
    .run()
    .await
}
