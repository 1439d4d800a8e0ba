//! # configs
//!
//! Process-wide settings, loaded once at startup and handed explicitly to
//! the store, the token authority and the router.
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. `config/bookshelf.toml`, or the file named by `BOOKSHELF_CONFIG`
//! 3. `.env` (via dotenvy) and the process environment, `APP__` prefixed,
//!    `__` separated: `APP__AUTH__SECRET`, `APP__SERVER__PORT`, ...

use config::{Config, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

const DEFAULT_CONFIG_FILE: &str = "config/bookshelf";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub cors: CorsSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Unset selects the in-memory store.
    pub url: Option<SecretString>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// HMAC secret for bearer tokens.
    pub secret: SecretString,
    pub token_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Empty allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub level: String,
    pub format: LogFormat,
}

impl Settings {
    /// Reads `.env`, then layers every source.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let file = std::env::var("BOOKSHELF_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::from_sources(Some(&file), Environment::with_prefix("APP"))
    }

    /// Layers defaults, an optional file and the given environment source.
    pub fn from_sources(file: Option<&str>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("database.max_connections", 10)?
            .set_default("auth.token_ttl_secs", 3600)?
            .set_default("cors.allowed_origins", Vec::<String>::new())?
            .set_default("log.level", "info")?
            .set_default("log.format", "text")?;

        if let Some(file) = file {
            builder = builder.add_source(File::with_name(file).required(false));
        }

        let settings: Self = builder
            .add_source(
                env.prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        debug!(host = %settings.server.host, port = settings.server.port, "settings loaded");
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.secret.expose_secret().trim().is_empty() {
            return Err(ConfigError::Invalid { key: "auth.secret", reason: "must not be empty".into() });
        }
        if self.auth.token_ttl_secs == 0 {
            return Err(ConfigError::Invalid { key: "auth.token_ttl_secs", reason: "must be positive".into() });
        }
        if self.server.port == 0 {
            return Err(ConfigError::Invalid { key: "server.port", reason: "must be positive".into() });
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid { key: "database.max_connections", reason: "must be positive".into() });
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
