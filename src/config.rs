//! Configuration management for the smart task service.
//!
//! Configuration can be set via environment variables:
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `DATA_DIR` - Optional. Directory for stored data. Defaults to `./.smart-tasks`.
//! - `STORE_BACKEND` - Optional. `file` (default), `sqlite`, or `memory`.
//! - `STORE_KEY` - Optional. Key the tasks are saved under. Defaults to `task-manager-data`.
//! - `OPENAI_API_KEY` - Optional. Seeds the stored credential when none is saved yet.
//! - `OPENAI_API_URL` - Optional. Chat-completions endpoint. Defaults to OpenAI's.
//! - `DEFAULT_MODEL` - Optional. Completion model. Defaults to `gpt-4o-mini`.
//! - `LLM_TIMEOUT_SECS` - Optional. Per-request timeout. Defaults to `30`.
//! - `LLM_MAX_RETRIES` - Optional. Transport retries for transient failures. Defaults to `0`.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::llm::OPENAI_API_URL;
use crate::persistence::{PersistenceType, DEFAULT_STORE_KEY};
use crate::planner::DEFAULT_MODEL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Completion provider configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Chat-completions endpoint
    pub api_url: String,

    /// Model identifier sent with every request
    pub model: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// Retries for transient transport failures (0 = single attempt)
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: OPENAI_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 0,
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Directory for the file and sqlite backends
    pub data_dir: PathBuf,

    /// Persistence backend
    pub store_backend: PersistenceType,

    /// Key the task collection is saved under
    pub store_key: String,

    /// Credential used when the store has none saved
    pub openai_api_key: Option<String>,

    pub llm: LlmConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = parse_env("PORT", 3000)?;

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.smart-tasks"));

        let store_backend = std::env::var("STORE_BACKEND")
            .map(|v| PersistenceType::from_str(&v))
            .unwrap_or_default();

        let store_key =
            std::env::var("STORE_KEY").unwrap_or_else(|_| DEFAULT_STORE_KEY.to_string());

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let llm = LlmConfig {
            api_url: std::env::var("OPENAI_API_URL").unwrap_or_else(|_| OPENAI_API_URL.to_string()),
            model: std::env::var("DEFAULT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(parse_env("LLM_TIMEOUT_SECS", 30)?),
            max_retries: parse_env("LLM_MAX_RETRIES", 0)?,
        };

        Ok(Self {
            host,
            port,
            data_dir,
            store_backend,
            store_key,
            openai_api_key,
            llm,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(data_dir: PathBuf, store_backend: PersistenceType) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            data_dir,
            store_backend,
            store_key: DEFAULT_STORE_KEY.to_string(),
            openai_api_key: None,
            llm: LlmConfig::default(),
        }
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}
