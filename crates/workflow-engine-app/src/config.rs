//! Process-local `SecretSource`. The teacher's dependency stack does not
//! carry an AWS SDK crate, so secrets are resolved from environment
//! variables named after the secret id rather than a live Secrets Manager
//! call — the same shape (`region`, `secret_id` in, `(user, password)`
//! out) a real implementation would have.

use workflow_engine_core::config::{ConfigError, ConfigResult, SecretSource};

pub struct EnvSecretSource;

impl SecretSource for EnvSecretSource {
    fn get_secret(&self, _region: &str, secret_id: &str) -> ConfigResult<(String, String)> {
        let user_key = format!("{secret_id}_DB_USER");
        let password_key = format!("{secret_id}_DB_PASSWORD");
        let user = std::env::var(&user_key).map_err(|_| ConfigError::EnvVarNotFound(user_key))?;
        let password = std::env::var(&password_key).map_err(|_| ConfigError::EnvVarNotFound(password_key))?;
        Ok((user, password))
    }
}
