//! Database credentials with time-bounded caching.
//!
//! # Design
//! `SecretsProvider` owns a single cached `DatabaseConfig` and its expiry.
//! While the entry is fresh it is returned as-is. Once it expires the
//! provider refreshes: in production with a configured `SecretSource` it
//! fetches from that source, otherwise (or when the fetch fails) it builds
//! the config from environment defaults. Both paths refill the cache, so a
//! fallback value stays in place for a full TTL even if the source recovers.
//!
//! The cache lives behind an async mutex held across the refresh, so
//! concurrent callers wait for one fetch instead of issuing several.
//!
//! Two sources ship: `AwsSecretSource` reads a JSON secret from AWS Secrets
//! Manager, `FileSecretSource` reads the same document from disk.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_secretsmanager::config::Region;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use serde::Deserialize;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::Instant;

use crate::config::{Config, DatabaseEnv, Environment};

/// How long a fetched config stays valid.
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslMode {
    Disable,
    Prefer,
    /// Encrypt the connection without verifying the server certificate.
    Require,
}

impl SslMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
        }
    }

    fn for_environment(environment: Environment) -> Self {
        if environment.is_production() {
            SslMode::Require
        } else {
            SslMode::Disable
        }
    }
}

impl FromStr for SslMode {
    type Err = SecretError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            other => Err(SecretError::Invalid(format!("unknown sslmode '{other}'"))),
        }
    }
}

/// Connection parameters for the relational backend.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub ssl_mode: SslMode,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("Failed to read secret document: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed secret document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid secret value: {0}")]
    Invalid(String),

    #[error("Secret store request failed: {0}")]
    Remote(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u16),
    Text(String),
}

/// The structured secret as stored in the secret document.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSecrets {
    pub db_host: String,
    #[serde(default)]
    db_port: Option<PortValue>,
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    #[serde(default)]
    pub db_sslmode: Option<String>,
}

impl DatabaseSecrets {
    fn into_config(self, default_ssl: SslMode) -> Result<DatabaseConfig, SecretError> {
        let port = match self.db_port {
            None => crate::config::DEFAULT_DB_PORT,
            Some(PortValue::Number(p)) => p,
            Some(PortValue::Text(s)) => s
                .trim()
                .parse()
                .map_err(|_| SecretError::Invalid(format!("db_port '{s}'")))?,
        };
        let ssl_mode = match self.db_sslmode {
            Some(mode) => mode.parse()?,
            None => default_ssl,
        };
        Ok(DatabaseConfig {
            host: self.db_host,
            port,
            database: self.db_name,
            user: self.db_user,
            password: self.db_password,
            ssl_mode,
        })
    }
}

/// An external store holding the database secret.
#[async_trait]
pub trait SecretSource: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<DatabaseSecrets, SecretError>;
}

/// Reads the secret from a JSON document on disk, e.g. a secret-manager
/// entry projected into the container filesystem.
#[derive(Debug, Clone)]
pub struct FileSecretSource {
    path: PathBuf,
}

impl FileSecretSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl SecretSource for FileSecretSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch(&self) -> Result<DatabaseSecrets, SecretError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        parse_secret_document(&raw)
    }
}

/// Reads the secret from AWS Secrets Manager. The SDK client is built on the
/// first fetch, so constructing the source does no I/O.
#[derive(Debug)]
pub struct AwsSecretSource {
    region: String,
    secret_name: String,
    client: OnceCell<aws_sdk_secretsmanager::Client>,
}

impl AwsSecretSource {
    pub fn new(region: impl Into<String>, secret_name: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            secret_name: secret_name.into(),
            client: OnceCell::new(),
        }
    }

    pub fn secret_name(&self) -> &str {
        &self.secret_name
    }

    async fn client(&self) -> &aws_sdk_secretsmanager::Client {
        self.client
            .get_or_init(|| async {
                let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                    .region(Region::new(self.region.clone()))
                    .load()
                    .await;
                aws_sdk_secretsmanager::Client::new(&sdk_config)
            })
            .await
    }
}

#[async_trait]
impl SecretSource for AwsSecretSource {
    fn name(&self) -> &str {
        "aws-secrets-manager"
    }

    async fn fetch(&self) -> Result<DatabaseSecrets, SecretError> {
        let output = self
            .client()
            .await
            .get_secret_value()
            .secret_id(&self.secret_name)
            .send()
            .await
            .map_err(|e| SecretError::Remote(DisplayErrorContext(e).to_string()))?;
        let raw = output.secret_string().ok_or_else(|| {
            SecretError::Invalid(format!("secret '{}' has no string value", self.secret_name))
        })?;
        parse_secret_document(raw)
    }
}

fn parse_secret_document(raw: &str) -> Result<DatabaseSecrets, SecretError> {
    Ok(serde_json::from_str(raw)?)
}

struct CachedConfig {
    value: DatabaseConfig,
    expires_at: Instant,
}

pub struct SecretsProvider {
    environment: Environment,
    source: Option<Arc<dyn SecretSource>>,
    fallback: DatabaseEnv,
    ttl: Duration,
    cache: Mutex<Option<CachedConfig>>,
}

impl fmt::Debug for SecretsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretsProvider")
            .field("environment", &self.environment)
            .field("source", &self.source)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SecretsProvider {
    pub fn new(environment: Environment, fallback: DatabaseEnv) -> Self {
        Self {
            environment,
            source: None,
            fallback,
            ttl: CACHE_TTL,
            cache: Mutex::new(None),
        }
    }

    /// `AWS_REGION` selects Secrets Manager; otherwise `SECRETS_FILE`, if set,
    /// selects the on-disk document.
    pub fn from_config(config: &Config) -> Self {
        let provider = Self::new(config.environment, config.database.clone());
        if let Some(region) = &config.aws_region {
            return provider.with_source(Arc::new(AwsSecretSource::new(
                region.as_str(),
                config.secret_name.as_str(),
            )));
        }
        match &config.secrets_file {
            Some(path) => provider.with_source(Arc::new(FileSecretSource::new(path))),
            None => provider,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn SecretSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub async fn database_config(&self) -> DatabaseConfig {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if Instant::now() < cached.expires_at {
                return cached.value.clone();
            }
        }

        let value = self.refresh().await;
        *cache = Some(CachedConfig {
            value: value.clone(),
            expires_at: Instant::now() + self.ttl,
        });
        value
    }

    pub async fn clear_cache(&self) {
        *self.cache.lock().await = None;
    }

    async fn refresh(&self) -> DatabaseConfig {
        let default_ssl = SslMode::for_environment(self.environment);
        let source = match &self.source {
            Some(source) if self.environment.is_production() => source,
            _ => {
                tracing::info!("Using environment variables for database credentials");
                return self.fallback_config();
            }
        };

        tracing::info!(source = source.name(), "Fetching database secrets");
        match source.fetch().await.and_then(|s| s.into_config(default_ssl)) {
            Ok(config) => {
                tracing::info!(source = source.name(), "Retrieved database secrets");
                config
            }
            Err(e) => {
                tracing::error!(source = source.name(), error = %e, "Failed to retrieve secrets");
                tracing::warn!("Falling back to environment variables");
                self.fallback_config()
            }
        }
    }

    fn fallback_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            host: self.fallback.host().to_string(),
            port: self.fallback.port,
            database: self.fallback.name.clone(),
            user: self.fallback.user.clone(),
            password: self.fallback.password.clone(),
            ssl_mode: SslMode::for_environment(self.environment),
        }
    }
}
