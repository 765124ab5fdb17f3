//! Process configuration read from environment variables.

use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_DATA_FILE: &str = "data/db.json";
pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_DB_NAME: &str = "todoapp";
pub const DEFAULT_DB_USER: &str = "todoapp_user";
pub const DEFAULT_DB_PASSWORD: &str = "todoapp_password";
pub const DEFAULT_SECRET_NAME: &str = "todoapp-secrets";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// `None` for names outside the known set.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Environment::Development),
            "test" => Some(Environment::Test),
            "production" | "prod" => Some(Environment::Production),
            _ => None,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {var}")]
    Invalid { var: &'static str, value: String },
}

/// Database settings used when the environment supplies them directly.
/// These double as the fallback when the secret store is unavailable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseEnv {
    /// `None` when `DB_HOST` is unset.
    pub host: Option<String>,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl DatabaseEnv {
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_DB_HOST)
    }
}

impl Default for DatabaseEnv {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_DB_PORT,
            name: DEFAULT_DB_NAME.to_string(),
            user: DEFAULT_DB_USER.to_string(),
            password: DEFAULT_DB_PASSWORD.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub data_file: PathBuf,
    pub database: DatabaseEnv,
    pub secrets_file: Option<PathBuf>,
    /// Region of the AWS Secrets Manager holding the database secret.
    pub aws_region: Option<String>,
    pub secret_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            database: DatabaseEnv::default(),
            secrets_file: None,
            aws_region: None,
            secret_name: DEFAULT_SECRET_NAME.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup. Empty values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = match get("APP_ENV").or_else(|| get("NODE_ENV")) {
            Some(name) => Environment::from_name(&name).unwrap_or_else(|| {
                tracing::warn!(
                    environment = %name,
                    "Unknown environment name, running as development"
                );
                Environment::Development
            }),
            None => Environment::default(),
        };
        let defaults = DatabaseEnv::default();

        Ok(Self {
            environment,
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_port("API_PORT", get("API_PORT"), DEFAULT_PORT)?,
            data_file: get("DATA_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE)),
            database: DatabaseEnv {
                host: get("DB_HOST"),
                port: parse_port("DB_PORT", get("DB_PORT"), defaults.port)?,
                name: get("DB_NAME").unwrap_or(defaults.name),
                user: get("DB_USER").unwrap_or(defaults.user),
                password: get("DB_PASSWORD").unwrap_or(defaults.password),
            },
            secrets_file: get("SECRETS_FILE").map(PathBuf::from),
            aws_region: get("AWS_REGION"),
            secret_name: get("SECRETS_MANAGER_SECRET_NAME")
                .unwrap_or_else(|| DEFAULT_SECRET_NAME.to_string()),
        })
    }

    /// Postgres is used in production or when a non-local database host is
    /// configured. Decided once at startup.
    pub fn use_postgres(&self) -> bool {
        self.environment.is_production()
            || self
                .database
                .host
                .as_deref()
                .is_some_and(|h| h != DEFAULT_DB_HOST)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_port(var: &'static str, value: Option<String>, default: u16) -> Result<u16, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value: v }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_select_file_store() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.environment, Environment::Development);
        assert_eq!(cfg.listen_addr(), "0.0.0.0:3001");
        assert_eq!(cfg.data_file, PathBuf::from("data/db.json"));
        assert_eq!(cfg.database.host(), "localhost");
        assert_eq!(cfg.database.port, 5432);
        assert!(!cfg.use_postgres());
    }

    #[test]
    fn production_selects_postgres() {
        let cfg = config(&[("APP_ENV", "production")]).unwrap();
        assert!(cfg.use_postgres());
    }

    #[test]
    fn node_env_is_honored_when_app_env_unset() {
        let cfg = config(&[("NODE_ENV", "production")]).unwrap();
        assert_eq!(cfg.environment, Environment::Production);
    }

    #[test]
    fn remote_db_host_selects_postgres() {
        assert!(config(&[("DB_HOST", "db.internal")]).unwrap().use_postgres());
        assert!(!config(&[("DB_HOST", "localhost")]).unwrap().use_postgres());
    }

    #[test]
    fn invalid_port_is_reported() {
        let err = config(&[("API_PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "API_PORT", .. }));
    }

    #[test]
    fn unknown_environment_runs_as_development() {
        let cfg = config(&[("APP_ENV", "staging")]).unwrap();
        assert_eq!(cfg.environment, Environment::Development);
        assert!(!cfg.environment.is_production());
        assert!(!cfg.use_postgres());

        let cfg = config(&[("NODE_ENV", "qa")]).unwrap();
        assert_eq!(cfg.environment, Environment::Development);
    }

    #[test]
    fn environment_names_are_case_insensitive() {
        assert_eq!(Environment::from_name("PROD"), Some(Environment::Production));
        assert_eq!(Environment::from_name(" Test "), Some(Environment::Test));
        assert_eq!(Environment::from_name("staging"), None);
    }

    #[test]
    fn secret_manager_settings() {
        let cfg = config(&[]).unwrap();
        assert!(cfg.aws_region.is_none());
        assert_eq!(cfg.secret_name, "todoapp-secrets");

        let cfg = config(&[
            ("AWS_REGION", "eu-west-1"),
            ("SECRETS_MANAGER_SECRET_NAME", "prod/todo"),
        ])
        .unwrap();
        assert_eq!(cfg.aws_region.as_deref(), Some("eu-west-1"));
        assert_eq!(cfg.secret_name, "prod/todo");
    }

    #[test]
    fn empty_values_count_as_unset() {
        let cfg = config(&[("DB_HOST", ""), ("API_PORT", " ")]).unwrap();
        assert!(cfg.database.host.is_none());
        assert_eq!(cfg.port, DEFAULT_PORT);
    }
}
