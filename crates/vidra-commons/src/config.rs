//! Configuration building blocks shared by the service binaries.
//!
//! Each service composes its own `Config` struct from the settings
//! types below and loads it from a TOML file with [`load_config`].
//! Secrets and connection strings can be overridden through
//! `VIDRA_*` environment variables so they stay out of checked-in
//! files.

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// 0 means one worker per CPU core.
    #[serde(default)]
    pub workers: usize,
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging settings for the `log` facade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Postgres connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresSettings {
    pub host: String,
    #[serde(default = "default_pg_port")]
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,
}

impl PostgresSettings {
    /// Connection URL; `VIDRA_DATABASE_URL` overrides the file.
    pub fn url(&self) -> String {
        env::var("VIDRA_DATABASE_URL").unwrap_or_else(|_| {
            format!(
                "postgres://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.database
            )
        })
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

/// Redis connection settings (session cache, pub/sub bus, queue).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSettings {
    pub host: String,
    #[serde(default = "default_redis_port")]
    pub port: u16,
    #[serde(default)]
    pub db: i64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,
}

impl RedisSettings {
    /// Connection URL; `VIDRA_REDIS_URL` overrides the file.
    pub fn url(&self) -> String {
        env::var("VIDRA_REDIS_URL")
            .unwrap_or_else(|_| format!("redis://{}:{}/{}", self.host, self.port, self.db))
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

/// Token and password-hash settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: String,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
}

impl AuthSettings {
    /// Signing secret; `VIDRA_JWT_SECRET` overrides the file.
    pub fn secret(&self) -> String {
        env::var("VIDRA_JWT_SECRET").unwrap_or_else(|_| self.jwt_secret.clone())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

/// Object-store settings: local directory or S3-compatible bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreSettings {
    /// "local" or "s3".
    pub backend: String,
    /// Root directory for the local backend.
    #[serde(default = "default_blob_root")]
    pub root_path: String,
    /// Bucket name for the s3 backend.
    #[serde(default)]
    pub bucket: String,
    /// Endpoint override for MinIO-style deployments.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
}

/// Where the gateway finds the backend services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEndpoints {
    pub member_url: String,
    pub streaming_url: String,
}

/// Transcode queue tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_nack_backoff")]
    pub nack_backoff_secs: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            nack_backoff_secs: default_nack_backoff(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_pg_port() -> u16 {
    5432
}

fn default_redis_port() -> u16 {
    6379
}

fn default_max_connections() -> u32 {
    5
}

fn default_retry_count() -> u32 {
    5
}

fn default_retry_interval() -> u64 {
    3
}

fn default_bcrypt_cost() -> u32 {
    10
}

fn default_session_ttl() -> u64 {
    3600
}

fn default_blob_root() -> String {
    "./data/blobs".to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_nack_backoff() -> u64 {
    10
}

/// Load a TOML config file into a typed settings struct.
pub fn load_config<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let content = fs::read_to_string(path.as_ref()).map_err(|e| {
        anyhow::anyhow!("failed to read config file {}: {}", path.as_ref().display(), e)
    })?;
    toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("failed to parse config file: {}", e))
}

/// Validate a log level string.
pub fn validate_log_level(level: &str) -> anyhow::Result<()> {
    let valid = ["error", "warn", "info", "debug", "trace"];
    if !valid.contains(&level) {
        return Err(anyhow::anyhow!(
            "invalid log level '{}'. Must be one of: {}",
            level,
            valid.join(", ")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Debug, Deserialize)]
    struct TestConfig {
        server: ServerSettings,
        #[serde(default)]
        logging: LoggingSettings,
        auth: AuthSettings,
    }

    #[test]
    fn test_load_config_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
host = "127.0.0.1"
port = 8081

[auth]
jwt_secret = "test-secret"
"#
        )
        .unwrap();

        let config: TestConfig = load_config(file.path()).unwrap();
        assert_eq!(config.server.bind_addr(), "127.0.0.1:8081");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.auth.bcrypt_cost, 10);
        assert_eq!(config.auth.session_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result: anyhow::Result<TestConfig> = load_config("/nonexistent/config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_log_level() {
        assert!(validate_log_level("debug").is_ok());
        assert!(validate_log_level("verbose").is_err());
    }
}
