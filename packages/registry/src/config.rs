use std::env;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid port number: {0}")]
    InvalidPort(String),
    #[error("Port {0} is out of valid range (1-65535)")]
    PortOutOfRange(u16),
    #[error("Invalid TTL seconds: {0}")]
    InvalidTtl(String),
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub port: u16,
    pub db_path: PathBuf,
    pub ttl_secs: u64,
}

impl RegistryConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port_str = env::var("REGISTRY_PORT").unwrap_or_else(|_| "8080".to_string());
        let port = port_str
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort(port_str))?;
        if port == 0 {
            return Err(ConfigError::PortOutOfRange(port));
        }

        let db_path = env::var("REGISTRY_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("aviary-registry.db"));

        let ttl_str = env::var("REGISTRY_TTL_SECS").unwrap_or_else(|_| "60".to_string());
        let ttl_secs = ttl_str
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidTtl(ttl_str))?;

        Ok(RegistryConfig {
            port,
            db_path,
            ttl_secs,
        })
    }
}
