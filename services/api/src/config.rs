use std::net::SocketAddr;
use std::path::PathBuf;
use t2dm_sim_core::advisor::gemini::DEFAULT_API_BASE;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
///
/// A missing `GEMINI_API_KEY` is not a startup failure: the simulator works
/// without it and the remote advisor reports the problem on each call.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub gemini_api_base: String,
    pub content_path: Option<PathBuf>,
    pub log_level: Level,
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let gemini_api_key = optional_var("GEMINI_API_KEY");
        let gemini_model = optional_var("GEMINI_MODEL");
        let gemini_api_base =
            optional_var("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let content_path = optional_var("CONTENT_PATH").map(PathBuf::from);
        if let Some(path) = &content_path {
            if !path.is_dir() {
                return Err(ConfigError::InvalidValue(
                    "CONTENT_PATH".to_string(),
                    format!("'{}' is not a directory", path.display()),
                ));
            }
        }

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            gemini_api_key,
            gemini_model,
            gemini_api_base,
            content_path,
            log_level,
        })
    }
}
