//! API configuration

use infra_db::DatabaseSettings;
use serde::Deserialize;

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Log level
    pub log_level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_*` environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", defaults.port)?
            .set_default("log_level", defaults.log_level)?
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Loads database settings from `DB_*` environment variables
///
/// Pool tuning is nested under `DB_POOL__`, e.g. `DB_POOL__POOL_TIMEOUT=5`.
/// Values stay strings until deserialization, so credentials such as `007`
/// reach the settings unchanged.
pub fn database_settings_from_env() -> Result<DatabaseSettings, config::ConfigError> {
    database_settings_from(database_environment())
}

fn database_environment() -> config::Environment {
    config::Environment::with_prefix("DB")
        .prefix_separator("_")
        .separator("__")
}

fn database_settings_from(
    environment: config::Environment,
) -> Result<DatabaseSettings, config::ConfigError> {
    config::Config::builder()
        .add_source(environment)
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_addr() {
        let config = ApiConfig {
            port: 9000,
            ..ApiConfig::default()
        };
        assert_eq!(config.server_addr(), "0.0.0.0:9000");
    }

    #[test]
    fn test_database_settings_from_source() {
        let settings: DatabaseSettings = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                host = "db.local"
                port = 5433
                user = "collector"
                password = "pw"
                database = "diecastor"

                [pool]
                pool_timeout = 1
                pool_pre_ping = false
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.port, 5433);
        assert_eq!(settings.driver, infra_db::settings::DEFAULT_DRIVER);
        assert_eq!(settings.pool.pool_timeout, 1);
        assert_eq!(settings.pool.pool_recycle, 3600);
        assert!(!settings.pool.pool_pre_ping);
    }

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let source: config::Map<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        database_environment().source(Some(source))
    }

    #[test]
    fn test_env_credentials_kept_verbatim() {
        let settings = database_settings_from(env(&[
            ("DB_HOST", "db.local"),
            ("DB_PORT", "5433"),
            ("DB_USER", "collector"),
            ("DB_PASSWORD", "007"),
            ("DB_DATABASE", "TRUE"),
        ]))
        .unwrap();

        assert_eq!(settings.password, "007");
        assert_eq!(settings.database, "TRUE");
        assert_eq!(settings.port, 5433);
    }

    #[test]
    fn test_env_pool_tuning_parsed() {
        let settings = database_settings_from(env(&[
            ("DB_HOST", "db.local"),
            ("DB_PORT", "5432"),
            ("DB_USER", "collector"),
            ("DB_PASSWORD", "pw"),
            ("DB_DATABASE", "diecastor"),
            ("DB_DRIVER", "postgresql+asyncpg://"),
            ("DB_POOL__POOL_TIMEOUT", "1"),
            ("DB_POOL__POOL_PRE_PING", "false"),
            ("DB_POOL__MAX_OVERFLOW", "0"),
        ]))
        .unwrap();

        assert_eq!(settings.driver, "postgresql+asyncpg://");
        assert_eq!(settings.pool.pool_timeout, 1);
        assert!(!settings.pool.pool_pre_ping);
        assert_eq!(settings.pool.max_overflow, 0);
        assert_eq!(settings.pool.pool_size, 5);
    }

    #[test]
    fn test_database_settings_require_credentials() {
        let result: Result<DatabaseSettings, _> = config::Config::builder()
            .add_source(config::File::from_str(
                r#"host = "db.local""#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize();

        assert!(result.is_err());
    }
}
