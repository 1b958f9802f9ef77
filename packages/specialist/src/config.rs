use std::env;

use thiserror::Error;

use aviary_core::ToolSpec;

/// Tool advertisement compiled into the binary; override with
/// `AGENT_TOOLS_PATH` to ship a different specialist.
pub const DEFAULT_TOOLS_JSON: &str = include_str!("../config/tools.json");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid port number: {0}")]
    InvalidPort(String),
    #[error("Invalid numeric value for {name}: {value}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("Invalid ANCHOR_TEMPERATURES (expected comma-separated floats): {0}")]
    InvalidTemperatures(String),
    #[error("Failed to read tools file: {0}")]
    ToolsIo(#[from] std::io::Error),
    #[error("Invalid tools JSON: {0}")]
    ToolsJson(#[from] serde_json::Error),
}

#[derive(Debug)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug)]
pub struct EmbeddingsSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug)]
pub struct SpecialistConfig {
    pub agent_id: String,
    pub secret_token: String,
    pub base_url: String,
    pub registry_base_url: String,
    pub port: u16,
    pub heartbeat_secs: u64,
    pub llm: LlmSettings,
    pub embeddings: EmbeddingsSettings,
    pub temperatures: Vec<f32>,
    pub threshold: f32,
    pub n_results: usize,
    pub tools: Vec<ToolSpec>,
    pub corpus_path: Option<String>,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

impl SpecialistConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let agent_id = required("AGENT_ID")?;
        let secret_token = required("AGENT_SECRET_TOKEN")?;
        let base_url = required("AGENT_BASE_URL")?;

        let registry_base_url =
            env::var("REGISTRY_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

        let port_str = env::var("AGENT_PORT").unwrap_or_else(|_| "8010".to_string());
        let port = port_str
            .parse::<u16>()
            .ok()
            .filter(|port| *port > 0)
            .ok_or(ConfigError::InvalidPort(port_str))?;

        let heartbeat_str = env::var("HEARTBEAT_SECS").unwrap_or_else(|_| "40".to_string());
        let heartbeat_secs = heartbeat_str.parse::<u64>().ok().filter(|s| *s > 0).ok_or(
            ConfigError::InvalidNumber {
                name: "HEARTBEAT_SECS",
                value: heartbeat_str,
            },
        )?;

        let llm = LlmSettings {
            base_url: required("LLM_BASE_URL")?,
            api_key: env::var("LLM_API_KEY").unwrap_or_default(),
            model: required("LLM_MODEL")?,
        };

        let embeddings = EmbeddingsSettings {
            base_url: required("EMBEDDINGS_BASE_URL")?,
            api_key: env::var("EMBEDDINGS_API_KEY").unwrap_or_default(),
            model: required("EMBEDDINGS_MODEL")?,
        };

        let temps_str = env::var("ANCHOR_TEMPERATURES").unwrap_or_else(|_| "0.3,0.6,0.9".to_string());
        let temperatures = temps_str
            .split(',')
            .map(|value| value.trim().parse::<f32>())
            .collect::<Result<Vec<f32>, _>>()
            .ok()
            .filter(|temps| !temps.is_empty())
            .ok_or(ConfigError::InvalidTemperatures(temps_str))?;

        let threshold_str = env::var("ANCHOR_THRESHOLD").unwrap_or_else(|_| "0.35".to_string());
        let threshold =
            threshold_str
                .parse::<f32>()
                .map_err(|_| ConfigError::InvalidNumber {
                    name: "ANCHOR_THRESHOLD",
                    value: threshold_str,
                })?;

        let n_results_str = env::var("RAG_N_RESULTS").unwrap_or_else(|_| "6".to_string());
        let n_results = n_results_str.parse::<usize>().ok().filter(|n| *n > 0).ok_or(
            ConfigError::InvalidNumber {
                name: "RAG_N_RESULTS",
                value: n_results_str,
            },
        )?;

        let tools: Vec<ToolSpec> = match env::var("AGENT_TOOLS_PATH") {
            Ok(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            Err(_) => serde_json::from_str(DEFAULT_TOOLS_JSON)?,
        };

        let corpus_path = env::var("CORPUS_PATH").ok();

        Ok(SpecialistConfig {
            agent_id,
            secret_token,
            base_url,
            registry_base_url,
            port,
            heartbeat_secs,
            llm,
            embeddings,
            temperatures,
            threshold,
            n_results,
            tools,
            corpus_path,
        })
    }
}
