use std::env;
use std::fmt;
use std::net::SocketAddr;

use deepletters_core::KeyWrapService;
use thiserror::Error;

use crate::http::parse_socket_addr;

#[derive(Clone)]
pub struct Config {
    pub env: String,
    pub listen_addr: String,
    pub log_level: String,

    /// Master key text (standard or URL-safe base64 of 32 bytes).
    pub wrapping_key: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("WRAPPING_KEY is required")]
    MissingWrappingKey,
    #[error("WRAPPING_KEY must be base64 of exactly 32 bytes")]
    InvalidWrappingKey,
    #[error("invalid LISTEN_ADDR '{0}'")]
    InvalidListenAddr(String),
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let wrapping_key = env::var("WRAPPING_KEY")
            .unwrap_or_default()
            .trim()
            .to_string();
        if wrapping_key.is_empty() {
            return Err(ConfigError::MissingWrappingKey);
        }

        let cfg = Self {
            env: getenv_default("ENV", "development"),
            listen_addr: getenv_default("LISTEN_ADDR", ":8080"),
            log_level: getenv_default("LOG_LEVEL", "info"),
            wrapping_key,
        };

        cfg.wrap_service()?;
        cfg.socket_addr()?;
        Ok(cfg)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_socket_addr(&self.listen_addr)
            .map_err(|_| ConfigError::InvalidListenAddr(self.listen_addr.clone()))
    }

    pub fn wrap_service(&self) -> Result<KeyWrapService, ConfigError> {
        KeyWrapService::from_secret(&self.wrapping_key)
            .map_err(|_| ConfigError::InvalidWrappingKey)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("env", &self.env)
            .field("listen_addr", &self.listen_addr)
            .field("log_level", &self.log_level)
            .field("wrapping_key", &"<redacted>")
            .finish()
    }
}

fn getenv_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
