//! Configuration loaded from environment variables.

use std::env;
use std::fmt;
use std::net::SocketAddr;

use database::Database;

/// Admin web server configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Maximum database connections.
    pub database_pool_size: u32,
    /// Key for sealing stored access tokens (hex or base64, 32 bytes).
    pub config_key: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("database_url", &self.database_url)
            .field("database_pool_size", &self.database_pool_size)
            .field("config_key", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `ADMIN_ADDR` | Server bind address | `127.0.0.1:8788` |
    /// | `SQLITE_PATH` | SQLite database URL | `sqlite:whatsapp.db?mode=rwc` |
    /// | `DATABASE_POOL_SIZE` | Maximum database connections | `20` |
    /// | `WHATSAPP_CONFIG_KEY` | Access token sealing key | (required) |
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("ADMIN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8788".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url = env::var("SQLITE_PATH")
            .unwrap_or_else(|_| "sqlite:whatsapp.db?mode=rwc".to_string());

        let database_pool_size = match env::var("DATABASE_POOL_SIZE") {
            Ok(value) => parse_pool_size(&value)?,
            Err(_) => Database::DEFAULT_POOL_SIZE,
        };

        let config_key = env::var("WHATSAPP_CONFIG_KEY")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingConfigKey)?;

        Ok(Self {
            addr,
            database_url,
            database_pool_size,
            config_key,
        })
    }
}

fn parse_pool_size(value: &str) -> Result<u32, ConfigError> {
    match value.trim().parse::<u32>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(ConfigError::InvalidPoolSize(value.to_string())),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid ADMIN_ADDR format")]
    InvalidAddr,

    #[error("Invalid DATABASE_POOL_SIZE: {0:?}")]
    InvalidPoolSize(String),

    #[error("WHATSAPP_CONFIG_KEY environment variable is required")]
    MissingConfigKey,
}
