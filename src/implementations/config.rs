use serde::{ Deserialize, Serialize };
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::errors::AnnotatorError;
use crate::models::common::ModelRole;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Missing required API key: {0}")]
    MissingApiKey(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl From<ConfigError> for AnnotatorError {
    fn from(err: ConfigError) -> Self {
        AnnotatorError::ConfigError(err.to_string())
    }
}

/// Wire format spoken by a model endpoint
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI chat completions, also served by vLLM and most local servers
    #[default]
    OpenAI,
    Anthropic,
}

impl Provider {
    fn api_key_env_var(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default)]
    pub provider: Provider,

    /// API key; falls back to the provider's environment variable
    pub api_key: Option<String>,

    /// Full URL of the chat endpoint
    pub api_endpoint: String,

    pub model: String,

    /// System message sent with every request
    pub system_prompt: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    /// Model used for claim extraction
    pub text_model: ApiConfig,

    /// Model used for verification and correction
    pub vision_model: ApiConfig,

    /// Maximum tokens generated per call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Sampling temperature (0.0-1.0)
    #[serde(default)]
    pub temperature: f32,

    /// Requests in flight at once inside a batch
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Overrides for the built-in prompt templates, keyed by template name
    #[serde(default)]
    pub prompt_templates: HashMap<String, String>,
}

fn default_max_tokens() -> usize {
    4096
}

fn default_batch_concurrency() -> usize {
    8
}

fn default_timeout_secs() -> u64 {
    300
}

impl GatewayConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: GatewayConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_concurrency == 0 {
            return Err(ConfigError::InvalidValue("batch_concurrency must be at least 1".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidValue(
                format!("temperature {} is outside 0.0-2.0", self.temperature)
            ));
        }
        for (role, api) in [("text_model", &self.text_model), ("vision_model", &self.vision_model)] {
            if api.model.trim().is_empty() || api.api_endpoint.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    format!("{} needs both a model and an api_endpoint", role)
                ));
            }
        }
        Ok(())
    }

    pub fn api_for(&self, role: ModelRole) -> &ApiConfig {
        match role {
            ModelRole::Text => &self.text_model,
            ModelRole::Vision => &self.vision_model,
        }
    }

    /// Get the API key for a role, checking environment variables if not in config.
    ///
    /// OpenAI-compatible endpoints may run without a key (local vLLM servers);
    /// Anthropic always needs one.
    pub fn get_api_key(&self, role: ModelRole) -> Result<Option<String>, ConfigError> {
        use log::debug;

        let api = self.api_for(role);
        if let Some(api_key) = &api.api_key {
            debug!("Using {} API key from config", role);
            return Ok(Some(api_key.clone()));
        }

        let env_var = api.provider.api_key_env_var();
        match std::env::var(env_var) {
            Ok(key) => {
                debug!("Using {} API key from {}", role, env_var);
                Ok(Some(key))
            }
            Err(_) if api.provider == Provider::Anthropic =>
                Err(ConfigError::MissingApiKey(format!("{} is not set", env_var))),
            Err(_) => {
                debug!("No API key for {} model, sending unauthenticated requests", role);
                Ok(None)
            }
        }
    }
}

/// Default configuration: Qwen2.5 models behind a local OpenAI-compatible server
impl Default for GatewayConfig {
    fn default() -> Self {
        let endpoint = "http://localhost:8000/v1/chat/completions".to_string();

        GatewayConfig {
            text_model: ApiConfig {
                provider: Provider::OpenAI,
                api_key: None,
                api_endpoint: endpoint.clone(),
                model: "Qwen/Qwen2.5-14B-Instruct".to_string(),
                system_prompt: Some(
                    "You are Qwen, created by Alibaba Cloud. You are a helpful assistant.".to_string()
                ),
            },
            vision_model: ApiConfig {
                provider: Provider::OpenAI,
                api_key: None,
                api_endpoint: endpoint,
                model: "Qwen/Qwen2.5-VL-7B-Instruct".to_string(),
                system_prompt: None,
            },
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            batch_concurrency: default_batch_concurrency(),
            timeout_secs: default_timeout_secs(),
            prompt_templates: HashMap::new(),
        }
    }
}
