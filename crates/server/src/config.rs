use adapter::{MemberEntry, WebhookConfig};
use config::ConfigError;
use engine::EngineConfig;
use serde::Deserialize;
use std::collections::HashMap;

const APP_PREFIX: &str = "SUGGESTIONS";

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub security: SecuritySettings,
    #[serde(default)]
    pub engine: EngineConfig,
    /// Without a bridge, suggestions are kept locally and audit goes to the log.
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
    /// Static member table keyed by user id.
    #[serde(default)]
    pub membership: HashMap<String, MemberEntry>,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: String,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub acquire_timeout_secs: u64,
}

#[derive(Deserialize, Clone)]
pub struct SecuritySettings {
    pub admin_token: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let s = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.cors_origins", "*")?
            .set_default("database.url", "sqlite://data/suggestions.db")?
            .set_default("database.acquire_timeout_secs", 5)?
            .set_default("security.admin_token", "admin_secret_123")?
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::File::with_name(&format!("config.{}", run_mode)).required(false))
            // SUGGESTIONS_ENGINE__DEFAULTS__COOLDOWN_SECONDS=60
            .add_source(
                config::Environment::with_prefix(APP_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}
