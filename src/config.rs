//! Process configuration read from the environment (and an optional `.env`).

use std::path::PathBuf;
use std::sync::Once;

use thiserror::Error;

use crate::core::settings::DEFAULT_MODEL;
use crate::llm::{DEFAULT_BASE_URL, OpenAiConfig};

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const BASE_URL_VAR: &str = "OPENAI_BASE_URL";
pub const DEFAULT_MODEL_VAR: &str = "OPENAI_DEFAULT_MODEL";
pub const FLOWS_DIR_VAR: &str = "AGENTFLOW_FLOWS_DIR";
pub const OUTPUTS_DIR_VAR: &str = "AGENTFLOW_OUTPUTS_DIR";

static ENV_LOADER: Once = Once::new();

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub default_model: String,
    pub flows_dir: PathBuf,
    pub outputs_dir: PathBuf,
}

impl Config {
    /// Loads `.env` from the working directory (if any), then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        ENV_LOADER.call_once(|| {
            if let Ok(path) = dotenvy::dotenv() {
                log::debug!("Loaded environment from {}", path.display());
            }
        });
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = read(API_KEY_VAR).ok_or(ConfigError::MissingApiKey)?;
        Ok(Self {
            api_key,
            base_url: read(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            default_model: read(DEFAULT_MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            flows_dir: read(FLOWS_DIR_VAR).unwrap_or_else(|| "flows".to_string()).into(),
            outputs_dir: read(OUTPUTS_DIR_VAR)
                .unwrap_or_else(|| "outputs".to_string())
                .into(),
        })
    }

    pub fn openai(&self) -> OpenAiConfig {
        OpenAiConfig::new(self.api_key.clone()).with_base_url(self.base_url.clone())
    }
}
