use quiz_core::engine::DEFAULT_REVEAL_DELAY;
use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Defines the supported backends for quiz generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Gemini,
    /// Offline canned questions, for local development.
    Fixture,
}

impl Provider {
    fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAI => "gpt-4o",
            Provider::Gemini => "gemini-2.5-flash",
            Provider::Fixture => "fixture",
        }
    }

    /// The variable holding this provider's API key, if it needs one.
    fn key_var(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAI => Some("OPENAI_API_KEY"),
            Provider::Gemini => Some("GEMINI_API_KEY"),
            Provider::Fixture => None,
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "openai" => Ok(Provider::OpenAI),
            "fixture" => Ok(Provider::Fixture),
            other => Err(format!("'{}' is not one of gemini, openai, fixture", other)),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub chat_model: String,
    pub log_level: Level,
    pub prompts_path: PathBuf,
    pub reveal_delay: Duration,
    pub language: String,
}

/// Reads `name`, falling back to `default` when unset.
fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Reads and parses `name`; `expected` describes the accepted format.
fn parse_var<T: FromStr>(name: &str, default: &str, expected: &str) -> Result<T, ConfigError> {
    let raw = var_or(name, default);
    raw.parse::<T>().map_err(|_| {
        ConfigError::InvalidValue(
            name.to_string(),
            format!("'{}' is not {}", raw, expected),
        )
    })
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address = parse_var("BIND_ADDRESS", "0.0.0.0:3000", "a socket address")?;
        let provider = var_or("QUIZ_PROVIDER", "gemini")
            .parse::<Provider>()
            .map_err(|msg| ConfigError::InvalidValue("QUIZ_PROVIDER".to_string(), msg))?;

        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok();
        if let Some(var) = provider
            .key_var()
            .filter(|var| std::env::var(var).is_err())
        {
            return Err(ConfigError::MissingVar(format!(
                "{} must be set for the {:?} provider",
                var, provider
            )));
        }

        let chat_model = var_or("CHAT_MODEL", provider.default_model());
        let log_level = parse_var("RUST_LOG", "INFO", "a valid log level")?;
        let prompts_path = PathBuf::from(var_or("PROMPTS_PATH", "./prompts"));
        let delay_ms: u64 = parse_var(
            "REVEAL_DELAY_MS",
            &DEFAULT_REVEAL_DELAY.as_millis().to_string(),
            "a number of milliseconds",
        )?;
        let language = var_or("QUIZ_LANGUAGE", "Indonesian");

        Ok(Self {
            bind_address,
            provider,
            openai_api_key,
            gemini_api_key,
            chat_model,
            log_level,
            prompts_path,
            reveal_delay: Duration::from_millis(delay_ms),
            language,
        })
    }
}
