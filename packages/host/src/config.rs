use std::collections::HashMap;
use std::env;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid port number: {0}")]
    InvalidPort(String),
    #[error("Port {0} is out of valid range (1-65535)")]
    PortOutOfRange(u16),
    #[error("Invalid discovery retry seconds: {0}")]
    InvalidRetry(String),
    #[error("Invalid SPECIALIST_AGENTS_SECRETS_JSON: {0}")]
    InvalidSecrets(#[from] serde_json::Error),
}

#[derive(Debug)]
pub struct HostConfig {
    pub port: u16,
    pub registry_base_url: String,
    pub host_agent_id: String,
    pub discovery_retry_secs: u64,
    /// Per-agent A2A credentials distributed out-of-band, never issued by
    /// the registry.
    pub secrets: HashMap<String, String>,
    pub routing_policy_path: Option<String>,
    pub cors_origin: String,
}

impl HostConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port_str = env::var("HOST_PORT").unwrap_or_else(|_| "8000".to_string());
        let port = port_str
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort(port_str))?;
        if port == 0 {
            return Err(ConfigError::PortOutOfRange(port));
        }

        let registry_base_url =
            env::var("REGISTRY_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

        let host_agent_id = env::var("HOST_AGENT_ID").unwrap_or_else(|_| "host-agent".to_string());

        let retry_str = env::var("DISCOVERY_RETRY_SECS").unwrap_or_else(|_| "5".to_string());
        let discovery_retry_secs = retry_str
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidRetry(retry_str))?;

        let secrets_json =
            env::var("SPECIALIST_AGENTS_SECRETS_JSON").unwrap_or_else(|_| "{}".to_string());
        let secrets: HashMap<String, String> = serde_json::from_str(&secrets_json)?;

        let routing_policy_path = env::var("ROUTING_POLICY_PATH").ok();

        let cors_origin = env::var("CORS_ORIGIN").unwrap_or_else(|_| "*".to_string());

        Ok(HostConfig {
            port,
            registry_base_url,
            host_agent_id,
            discovery_retry_secs,
            secrets,
            routing_policy_path,
            cors_origin,
        })
    }
}
