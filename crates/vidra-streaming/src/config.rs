//! Streaming service configuration.

use serde::Deserialize;

use vidra_commons::config::{
    validate_log_level, LoggingSettings, ObjectStoreSettings, PostgresSettings, QueueSettings,
    RedisSettings, ServerSettings,
};

/// Full configuration of the streaming service binary.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamingConfig {
    pub server: ServerSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    pub postgres: PostgresSettings,
    pub redis: RedisSettings,
    pub object_store: ObjectStoreSettings,
    #[serde(default)]
    pub queue: QueueSettings,
    /// Base URL clients reach this service on; embedded in HLS URLs.
    pub public_base_url: String,
    /// Staging directory for uploads and transcode scratch space.
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: String,
}

fn default_tmp_dir() -> String {
    "./tmp".to_string()
}

impl StreamingConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config: StreamingConfig = vidra_commons::config::load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        validate_log_level(&self.logging.level)?;
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("server port cannot be 0"));
        }
        if self.public_base_url.is_empty() {
            return Err(anyhow::anyhow!("public_base_url must be set"));
        }
        if self.queue.max_attempts == 0 {
            return Err(anyhow::anyhow!("queue.max_attempts cannot be 0"));
        }
        Ok(())
    }
}
