//! Application Configuration Module
//!
//! Loads settings for the council service from the environment (and a `.env`
//! file, if present). Command-line flags are applied on top in `main`.

use council_core::credentials::KeyFile;
use council_core::debate::DEFAULT_MAX_TURNS;
use gemini_text::consts::{DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

const DEFAULT_SPEED_MS: u64 = 1500;

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub model: String,
    pub base_url: Option<String>,
    pub key_file: Option<PathBuf>,
    pub key_command: Option<String>,
    pub turn_delay: Duration,
    /// `None` disables the turn ceiling.
    pub max_turns: Option<usize>,
    pub request_timeout: Duration,
    pub prompts_dir: Option<PathBuf>,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
    #[error("Invalid value for {var}: {value:?} is not a non-negative integer")]
    InvalidNumber { var: &'static str, value: String },
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `GEMINI_MODEL`: (Optional) Model name. Defaults to "gemini-2.5-flash".
    // *   `GEMINI_BASE_URL`: (Optional) Override for the API base URL.
    // *   `COUNCIL_KEY_FILE`: (Optional) Where `key set` stores the API key.
    // *   `COUNCIL_KEY_COMMAND`: (Optional) A command that prints the API key.
    // *   `DEBATE_SPEED_MS`: (Optional) Pause between turns. Defaults to 1500.
    // *   `MAX_TURNS`: (Optional) Debater turns before auto-conclusion. 0 disables. Defaults to 10.
    // *   `REQUEST_TIMEOUT_SECS`: (Optional) Per-request timeout. Defaults to 60.
    // *   `PROMPTS_DIR`: (Optional) Directory of `.md` prompt overrides.
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is useful for local development and is ignored if not present.
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let model = var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = var("GEMINI_BASE_URL");
        let key_file = var("COUNCIL_KEY_FILE")
            .map(PathBuf::from)
            .or_else(|| KeyFile::default_path(&lookup));
        let key_command = var("COUNCIL_KEY_COMMAND");

        let speed = parse_number("DEBATE_SPEED_MS", var("DEBATE_SPEED_MS"))?.unwrap_or(DEFAULT_SPEED_MS);
        let max_turns = match parse_number("MAX_TURNS", var("MAX_TURNS"))? {
            Some(0) => None,
            Some(n) => Some(n as usize),
            None => Some(DEFAULT_MAX_TURNS),
        };
        let timeout = parse_number("REQUEST_TIMEOUT_SECS", var("REQUEST_TIMEOUT_SECS"))?
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            model,
            base_url,
            key_file,
            key_command,
            turn_delay: Duration::from_millis(speed),
            max_turns,
            request_timeout: Duration::from_secs(timeout),
            prompts_dir: var("PROMPTS_DIR").map(PathBuf::from),
            log_level,
        })
    }
}

fn parse_number(var: &'static str, value: Option<String>) -> Result<Option<u64>, ConfigError> {
    value
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidNumber { var, value })
        })
        .transpose()
}
