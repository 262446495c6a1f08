use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
    /// Use the first `X-Forwarded-For` entry as the client address.
    /// Only enable this behind a reverse proxy that sets the header.
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Length bounds for article forms, counted in Unicode characters.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WikiConfig {
    pub title_min_length: usize,
    pub title_max_length: usize,
    pub content_max_length: usize,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            title_min_length: 1,
            title_max_length: 50,
            content_max_length: 60_000,
        }
    }
}

/// Cooldown windows for article creation. A value of 0 disables that window.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CooldownConfig {
    pub new_article_by_ip_secs: u64,
    pub new_article_by_account_secs: u64,
    /// Applied to both keys instead of the regular window when an attempt fails.
    pub failed_attempt_secs: u64,
    pub cleanup_interval_secs: u64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            new_article_by_ip_secs: 5,
            new_article_by_account_secs: 5,
            failed_attempt_secs: 10,
            cleanup_interval_secs: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub wiki: WikiConfig,
    #[serde(default)]
    pub cooldown: CooldownConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.max_connections", 20)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., WIKI__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("WIKI").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
