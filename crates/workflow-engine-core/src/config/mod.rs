//! Runtime configuration bootstrap.
//!
//! [`RuntimeConfig`] is assembled once at process start and passed explicitly
//! into constructors from then on — there is no mutable global singleton.
//! Bootstrap order mirrors the original settings loader: region and the DB
//! secret id come from the environment, DB credentials come from a
//! secret-manager fetch, and anything else (app name, MCP server URL, ...)
//! is read from the `agent_config_store` table keyed by app name. A DB row
//! whose key doesn't match a known field is ignored, not an error.

pub mod error;

pub use error::{ConfigError, ConfigResult};

use std::env;

/// Database credentials resolved from a secret manager, keyed by region and
/// secret id. Kept as a trait so tests can supply a fake without touching a
/// real secret store.
pub trait SecretSource: Send + Sync {
    fn get_secret(&self, region: &str, secret_id: &str) -> ConfigResult<(String, String)>;
}

/// Immutable configuration for one running process.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub app_name: String,
    pub host: String,
    pub port: u16,
    pub db_host: String,
    pub db_name: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: String,
    pub mcp_server_url: Option<String>,
    pub tool_call_timeout_secs: u64,
}

impl RuntimeConfig {
    /// Read env-level settings, resolve DB credentials via `secrets`, then
    /// merge in any `agent_config_store` rows found for `app_name`.
    pub fn bootstrap(
        secrets: &dyn SecretSource,
        db_config_rows: &[(String, String)],
    ) -> ConfigResult<Self> {
        let region = env::var("AWS_REGION").unwrap_or_default();
        let db_secret_id = env::var("DB_SECRET_ID")
            .map_err(|_| ConfigError::EnvVarNotFound("DB_SECRET_ID".to_string()))?;
        let (db_user, db_password) = secrets.get_secret(&region, &db_secret_id)?;

        let mut config = Self {
            app_name: env::var("APP_NAME")
                .map_err(|_| ConfigError::EnvVarNotFound("APP_NAME".to_string()))?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|e| ConfigError::ParseError(format!("PORT: {e}")))?,
            db_host: env::var("DB_HOST")
                .map_err(|_| ConfigError::EnvVarNotFound("DB_HOST".to_string()))?,
            db_name: env::var("DB_NAME")
                .map_err(|_| ConfigError::EnvVarNotFound("DB_NAME".to_string()))?,
            db_port: env::var("DB_PORT")
                .unwrap_or_else(|_| "5432".to_string())
                .parse()
                .map_err(|e| ConfigError::ParseError(format!("DB_PORT: {e}")))?,
            db_user,
            db_password,
            mcp_server_url: None,
            tool_call_timeout_secs: 45,
        };

        config.merge_db_rows(db_config_rows);
        Ok(config)
    }

    /// Apply `agent_config_store` rows; an unrecognised key is skipped, not
    /// an error, matching the original loader's `continue` branch.
    fn merge_db_rows(&mut self, rows: &[(String, String)]) {
        for (key, value) in rows {
            match key.to_lowercase().as_str() {
                "app_name" => self.app_name = value.clone(),
                "mcp_server_url" | "cubeassist_mcp_server_url" => {
                    self.mcp_server_url = Some(value.clone())
                }
                "tool_call_timeout_secs" => {
                    if let Ok(secs) = value.parse() {
                        self.tool_call_timeout_secs = secs;
                    }
                }
                _ => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSecrets;
    impl SecretSource for FakeSecrets {
        fn get_secret(&self, _region: &str, _secret_id: &str) -> ConfigResult<(String, String)> {
            Ok(("agent".to_string(), "hunter2".to_string()))
        }
    }

    fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        for (k, v) in vars {
            env::set_var(k, v);
        }
        let result = f();
        for (k, _) in vars {
            env::remove_var(k);
        }
        result
    }

    #[test]
    fn bootstrap_reads_env_and_resolves_secrets() {
        let config = with_env(
            &[
                ("DB_SECRET_ID", "secret-1"),
                ("APP_NAME", "cube-assist"),
                ("DB_HOST", "db.internal"),
                ("DB_NAME", "workflows"),
            ],
            || RuntimeConfig::bootstrap(&FakeSecrets, &[]).unwrap(),
        );
        assert_eq!(config.app_name, "cube-assist");
        assert_eq!(config.db_user, "agent");
        assert_eq!(config.db_password, "hunter2");
        assert_eq!(config.tool_call_timeout_secs, 45);
    }

    #[test]
    fn unknown_db_row_key_is_ignored() {
        let config = with_env(
            &[
                ("DB_SECRET_ID", "secret-1"),
                ("APP_NAME", "cube-assist"),
                ("DB_HOST", "db.internal"),
                ("DB_NAME", "workflows"),
            ],
            || {
                RuntimeConfig::bootstrap(
                    &FakeSecrets,
                    &[("nonsense_key".to_string(), "value".to_string())],
                )
                .unwrap()
            },
        );
        assert_eq!(config.app_name, "cube-assist");
    }

    #[test]
    fn known_db_row_overrides_default() {
        let config = with_env(
            &[
                ("DB_SECRET_ID", "secret-1"),
                ("APP_NAME", "cube-assist"),
                ("DB_HOST", "db.internal"),
                ("DB_NAME", "workflows"),
            ],
            || {
                RuntimeConfig::bootstrap(
                    &FakeSecrets,
                    &[("mcp_server_url".to_string(), "https://tools.internal".to_string())],
                )
                .unwrap()
            },
        );
        assert_eq!(
            config.mcp_server_url.as_deref(),
            Some("https://tools.internal")
        );
    }
}
