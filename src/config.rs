//! Client configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://backendproject-01.vercel.app";
pub const DEFAULT_STORAGE_PATH: &str = ".portfolio/local_storage.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";

/// Errors produced while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A value was present but could not be parsed.
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl HttpTimeouts {
    #[must_use]
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    #[must_use]
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioConfig {
    pub api_url: String,
    pub storage_path: PathBuf,
    pub timeouts: HttpTimeouts,
    /// `None` when no Gemini key is configured; the assistant is then disabled.
    pub gemini: Option<GeminiConfig>,
}

impl PortfolioConfig {
    /// Build typed config from the process environment.
    ///
    /// Optional:
    /// - `PORTFOLIO_API_URL`: comments backend, default [`DEFAULT_API_URL`]
    /// - `PORTFOLIO_STORAGE_PATH`: local key/value file, default [`DEFAULT_STORAGE_PATH`]
    /// - `PORTFOLIO_REQUEST_TIMEOUT_SECS`: default 15
    /// - `PORTFOLIO_CONNECT_TIMEOUT_SECS`: default 5
    /// - `GEMINI_API_KEY`: enables the chat assistant
    /// - `GEMINI_MODEL`: default `gemini-pro`
    /// - `GEMINI_BASE_URL`: default Google Generative Language v1beta endpoint
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a timeout is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build typed config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a timeout is not a positive integer.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = non_empty(lookup("PORTFOLIO_API_URL"))
            .unwrap_or_else(|| DEFAULT_API_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let storage_path = non_empty(lookup("PORTFOLIO_STORAGE_PATH"))
            .map_or_else(|| PathBuf::from(DEFAULT_STORAGE_PATH), PathBuf::from);
        let timeouts = HttpTimeouts {
            request_secs: parse_secs(
                "PORTFOLIO_REQUEST_TIMEOUT_SECS",
                lookup("PORTFOLIO_REQUEST_TIMEOUT_SECS"),
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            connect_secs: parse_secs(
                "PORTFOLIO_CONNECT_TIMEOUT_SECS",
                lookup("PORTFOLIO_CONNECT_TIMEOUT_SECS"),
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )?,
        };

        let gemini = non_empty(lookup("GEMINI_API_KEY")).map(|api_key| GeminiConfig {
            api_key,
            model: non_empty(lookup("GEMINI_MODEL")).unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_owned()),
            base_url: non_empty(lookup("GEMINI_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_owned())
                .trim_end_matches('/')
                .to_owned(),
        });

        Ok(Self { api_url, storage_path, timeouts, gemini })
    }
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn parse_secs(key: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    let Some(value) = non_empty(raw) else {
        return Ok(default);
    };
    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::InvalidValue { key, value }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
