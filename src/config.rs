use serde::{Deserialize, Serialize};

use crate::model::Organization;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub platform: PlatformConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres server hosting one schema per project. Without it every
    /// project gets an embedded in-memory database.
    pub connection_string: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub default_region: String,
    pub default_branch_name: String,
    pub main_branch_name: String,
    /// `{project_id}` is substituted
    pub project_url_template: String,
    pub organizations: Vec<Organization>,
}

/// Which engine backs project databases
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorBackend {
    Embedded,
    Postgres(String),
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            default_region: "us-east-1".to_string(),
            default_branch_name: "develop".to_string(),
            main_branch_name: "main".to_string(),
            project_url_template: "https://{project_id}.pgbranch.dev".to_string(),
            organizations: vec![Organization {
                id: "default".to_string(),
                name: "Default Organization".to_string(),
            }],
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and config file
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        // Add default configuration
        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        // Add config file if it exists
        config = config.add_source(config::File::with_name("pgbranch").required(false));

        // Environment variables, e.g. PGBRANCH_SERVER__PORT=8080
        config = config.add_source(
            config::Environment::with_prefix("PGBRANCH")
                .separator("__")
                .prefix_separator("_"),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        Ok(app_config)
    }

    /// Pick the executor backend from config, falling back to DATABASE_URL
    pub fn executor_backend(&self) -> ExecutorBackend {
        if let Some(connection_string) = &self.database.connection_string {
            return ExecutorBackend::Postgres(connection_string.clone());
        }

        match std::env::var("DATABASE_URL") {
            Ok(url) if !url.is_empty() => ExecutorBackend::Postgres(url),
            _ => ExecutorBackend::Embedded,
        }
    }

    /// Get the server bind address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server_address(), "127.0.0.1:3001");
        assert_eq!(config.platform.default_branch_name, "develop");
        assert_eq!(config.platform.main_branch_name, "main");
        assert_eq!(config.platform.organizations.len(), 1);
    }

    #[test]
    fn test_connection_string_selects_postgres() {
        let mut config = AppConfig::default();
        config.database.connection_string = Some("postgres://localhost/branches".to_string());
        assert_eq!(
            config.executor_backend(),
            ExecutorBackend::Postgres("postgres://localhost/branches".to_string())
        );
    }

    #[test]
    fn test_defaults_survive_config_layering() {
        let built = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default()).unwrap())
            .build()
            .unwrap();
        let config: AppConfig = built.try_deserialize().unwrap();
        assert_eq!(config.platform, PlatformConfig::default());
        assert_eq!(config.server.port, 3001);
    }
}
