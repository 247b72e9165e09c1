pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod store;

use std::sync::Arc;

use axum::Router;

use crate::config::{AppConfig, ExecutorBackend};
use crate::store::PostgresConnector;

// Export API types
pub use api::handlers;
pub use api::routes;

pub use error::{PlatformError, PlatformResult};
pub use logic::{BranchOperations, ProjectOperations};
pub use model::*;
pub use store::Platform;

/// Build the shared platform with the executor backend the config selects
pub fn build_platform(config: &AppConfig) -> anyhow::Result<Arc<Platform>> {
    let platform = match config.executor_backend() {
        ExecutorBackend::Embedded => {
            log::info!("Projects get embedded in-memory SQLite databases");
            Platform::embedded(config.platform.clone())
        }
        ExecutorBackend::Postgres(url) => {
            log::info!("Projects get their own schema on the configured Postgres server");
            Platform::new(Arc::new(PostgresConnector::new(&url)?), config.platform.clone())
        }
    };
    Ok(Arc::new(platform))
}

/// Router with state attached, ready to serve
pub fn create_app(platform: Arc<Platform>) -> Router {
    api::routes::create_router().with_state(platform)
}

// Function for integration testing
pub async fn run_server() -> anyhow::Result<()> {
    use axum::serve;
    use tokio::net::TcpListener;

    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let config = AppConfig::load()?;
    let app = create_app(build_platform(&config)?);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("pgbranch listening on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
