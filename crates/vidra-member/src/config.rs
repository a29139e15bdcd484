//! Member service configuration.

use serde::Deserialize;

use vidra_commons::config::{
    validate_log_level, AuthSettings, LoggingSettings, PostgresSettings, RedisSettings,
    ServerSettings,
};

/// Full configuration of the member service binary.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberConfig {
    pub server: ServerSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    pub auth: AuthSettings,
    pub postgres: PostgresSettings,
    pub redis: RedisSettings,
}

impl MemberConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config: MemberConfig = vidra_commons::config::load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        validate_log_level(&self.logging.level)?;
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("server port cannot be 0"));
        }
        if self.auth.jwt_secret.is_empty() && std::env::var("VIDRA_JWT_SECRET").is_err() {
            return Err(anyhow::anyhow!(
                "jwt_secret must be set (config or VIDRA_JWT_SECRET)"
            ));
        }
        if self.auth.session_ttl_secs == 0 {
            return Err(anyhow::anyhow!("session_ttl_secs cannot be 0"));
        }
        Ok(())
    }
}
