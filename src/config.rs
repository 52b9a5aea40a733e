//! Configuration management for tool-loop.
//!
//! Configuration can be set via environment variables:
//! - `OPENAI_BASE_URL` (or `NIM_ENDPOINT`) - Required. Base URL of a Responses-compatible API.
//! - `OPENAI_MODEL` (or `NIM_MODEL`) - Required. Model identifier.
//! - `OPENAI_API_KEY` - Optional. Bearer token. Defaults to `none` for local servers.
//! - `MAX_ROUNDS` - Optional. Maximum model calls per conversation. Defaults to `10`.
//! - `CONCURRENT_TOOL_CALLS` - Optional. Run a response's tool calls together. Defaults to `false`.
//! - `MODEL_MAX_RETRIES` - Optional. Retries for transient backend errors. Defaults to `3`.
//! - `REQUEST_TIMEOUT_SECS` - Optional. Per-request HTTP timeout. Defaults to `120`.
//! - `REASONING_EFFORT` - Optional. Reasoning effort hint (`low`, `medium`, `high`).
//! - `AGENT_INSTRUCTIONS` - Optional. Persona placed at the top of the system prompt.
//! - `AGENT_DEMO` - Optional. Demo the binary runs (`tourism`, `supervisor`, `handoff`). Defaults to `tourism`.

use thiserror::Error;

use crate::agent::{LoopPolicy, DEFAULT_MAX_ROUNDS};
use crate::demo::Demo;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Runtime configuration, built once per process.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Responses API (without `/responses`)
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Bearer token sent with every request
    pub api_key: String,

    /// Maximum model calls per conversation
    pub max_rounds: usize,

    /// Dispatch all tool calls of a response concurrently
    pub concurrent_tool_calls: bool,

    /// Retries for rate limits, 5xx and network errors
    pub max_retries: u32,

    /// HTTP timeout per request
    pub request_timeout_secs: u64,

    /// Optional reasoning effort hint
    pub reasoning_effort: Option<String>,

    /// Optional persona override
    pub instructions: Option<String>,

    /// Demo the binary runs
    pub demo: Demo,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if the endpoint or model is not set,
    /// and `ConfigError::InvalidValue` if a numeric or boolean variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first_of = |keys: &[&str]| keys.iter().find_map(|key| lookup(key));

        let base_url = first_of(&["OPENAI_BASE_URL", "NIM_ENDPOINT"])
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENAI_BASE_URL".to_string()))?;

        let model = first_of(&["OPENAI_MODEL", "NIM_MODEL"])
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENAI_MODEL".to_string()))?;

        let api_key = lookup("OPENAI_API_KEY").unwrap_or_else(|| "none".to_string());

        let max_rounds = parse_var(&lookup, "MAX_ROUNDS")?.unwrap_or(DEFAULT_MAX_ROUNDS);
        if max_rounds == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_ROUNDS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let concurrent_tool_calls = lookup("CONCURRENT_TOOL_CALLS")
            .map(|v| {
                parse_bool(&v)
                    .map_err(|e| ConfigError::InvalidValue("CONCURRENT_TOOL_CALLS".to_string(), e))
            })
            .transpose()?
            .unwrap_or(false);

        let max_retries = parse_var(&lookup, "MODEL_MAX_RETRIES")?.unwrap_or(3);
        let request_timeout_secs = parse_var(&lookup, "REQUEST_TIMEOUT_SECS")?.unwrap_or(120);
        let demo = parse_var(&lookup, "AGENT_DEMO")?.unwrap_or_default();

        Ok(Self {
            base_url,
            model,
            api_key,
            max_rounds,
            concurrent_tool_calls,
            max_retries,
            request_timeout_secs,
            reasoning_effort: lookup("REASONING_EFFORT").filter(|v| !v.trim().is_empty()),
            instructions: lookup("AGENT_INSTRUCTIONS").filter(|v| !v.trim().is_empty()),
            demo,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            api_key: "none".to_string(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            concurrent_tool_calls: false,
            max_retries: 3,
            request_timeout_secs: 120,
            reasoning_effort: None,
            instructions: None,
            demo: Demo::default(),
        }
    }

    /// Loop policy derived from this configuration, without an observer.
    pub fn policy(&self) -> LoopPolicy {
        LoopPolicy::default()
            .with_max_rounds(self.max_rounds)
            .with_concurrent_tool_calls(self.concurrent_tool_calls)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidValue(key.to_string(), format!("{}", e)))
        })
        .transpose()
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        other => Err(format!("expected boolean-like value, got: {}", other)),
    }
}
