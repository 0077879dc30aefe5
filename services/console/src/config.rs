use parley_core::DepthLimitPolicy;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_api_base: String,
    pub chat_model: String,
    pub log_level: Level,
    pub prompts_path: PathBuf,
    pub manifest_path: PathBuf,
    pub max_tool_depth: usize,
    pub depth_policy: DepthLimitPolicy,
    pub context_window: Option<usize>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?;

        let openai_api_base = std::env::var("OPENAI_API_BASE")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./prompts"));

        let manifest_path = std::env::var("TOOL_MANIFEST_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./manifest/tools.json"));

        let max_tool_depth = match std::env::var("MAX_TOOL_DEPTH") {
            Ok(value) => match value.parse::<usize>() {
                Ok(depth) if depth >= 1 => depth,
                _ => {
                    return Err(ConfigError::InvalidValue(
                        "MAX_TOOL_DEPTH".to_string(),
                        format!("'{}' is not a positive integer", value),
                    ));
                }
            },
            Err(_) => 8,
        };

        let depth_policy_str =
            std::env::var("TOOL_DEPTH_POLICY").unwrap_or_else(|_| "error".to_string());
        let depth_policy = match depth_policy_str.to_lowercase().as_str() {
            "error" => DepthLimitPolicy::Error,
            "force_answer" => DepthLimitPolicy::ForceAnswer,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "TOOL_DEPTH_POLICY".to_string(),
                    format!("'{}' must be 'error' or 'force_answer'", depth_policy_str),
                ));
            }
        };

        let context_window = match std::env::var("CONTEXT_WINDOW") {
            Ok(value) => match value.parse::<usize>() {
                Ok(window) if window >= 1 => Some(window),
                _ => {
                    return Err(ConfigError::InvalidValue(
                        "CONTEXT_WINDOW".to_string(),
                        format!("'{}' is not a positive integer", value),
                    ));
                }
            },
            Err(_) => None,
        };

        Ok(Self {
            openai_api_key,
            openai_api_base,
            chat_model,
            log_level,
            prompts_path,
            manifest_path,
            max_tool_depth,
            depth_policy,
            context_window,
        })
    }
}
