//! Configuration management.
//!
//! Configuration can be set via environment variables:
//! - `LLM_API_KEY` - Required. API key for the completion endpoint.
//! - `LLM_BASE_URL` - Optional. OpenAI-compatible endpoint root. Defaults to
//!   `https://dashscope.aliyuncs.com/compatible-mode/v1`.
//! - `LLM_MODEL` - Optional. Model identifier. Defaults to `qwen-plus`.
//! - `LLM_TEMPERATURE` - Optional. Sampling temperature. Defaults to `0.7`.
//! - `LLM_TIMEOUT_SECS` - Optional. Per-request timeout. Defaults to `30`.
//! - `PATIENT_DB` - Optional. Patient record database path. Defaults to `data/patients.db`.
//! - `REPORT_DB` - Optional. Report sink database path. Defaults to `results/reports.db`.
//! - `PUBMED_MAX_RESULTS` - Optional. Literature enrichment size. Defaults to `5`.
//! - `MAX_CONTEXT_CHARS` - Optional. Step context character budget. Defaults to `60000`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Pipeline configuration. Constructed once at startup and threaded down to
/// every component; there is no ambient/global state.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the completion endpoint
    pub api_key: String,

    /// OpenAI-compatible endpoint root
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Sampling temperature for all tiers
    pub temperature: f64,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Patient record database path
    pub patient_db: PathBuf,

    /// Report sink database path
    pub report_db: PathBuf,

    /// Maximum literature results to fold into the initial prompt
    pub pubmed_max_results: usize,

    /// Character budget for the growing step context
    pub max_context_chars: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `LLM_API_KEY` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("LLM_API_KEY".to_string()))?;

        let base_url = std::env::var("LLM_BASE_URL")
            .unwrap_or_else(|_| "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string());

        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| "qwen-plus".to_string());

        let temperature = parse_var("LLM_TEMPERATURE", 0.7)?;
        let timeout_secs = parse_var("LLM_TIMEOUT_SECS", 30u64)?;
        let pubmed_max_results = parse_var("PUBMED_MAX_RESULTS", 5usize)?;
        let max_context_chars = parse_var("MAX_CONTEXT_CHARS", 60_000usize)?;

        let patient_db = std::env::var("PATIENT_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/patients.db"));

        let report_db = std::env::var("REPORT_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("results/reports.db"));

        Ok(Self {
            api_key,
            base_url,
            model,
            temperature,
            timeout_secs,
            patient_db,
            report_db,
            pubmed_max_results,
            max_context_chars,
        })
    }

}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{e}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both cases in one test: the environment is process-global and the
    // default test runner is multi-threaded.
    #[test]
    fn test_from_env_requires_api_key_then_applies_defaults() {
        std::env::remove_var("LLM_API_KEY");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::MissingEnvVar(_))
        ));

        std::env::set_var("LLM_API_KEY", "test-key");
        let config = Config::from_env().unwrap();
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.model, "qwen-plus");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.pubmed_max_results, 5);
        assert_eq!(config.max_context_chars, 60_000);
        assert_eq!(config.patient_db, PathBuf::from("data/patients.db"));
        std::env::remove_var("LLM_API_KEY");
    }

    #[test]
    fn test_parse_var_default_and_invalid() {
        assert_eq!(parse_var("CONSILIUM_TEST_UNSET", 7usize).unwrap(), 7);

        std::env::set_var("CONSILIUM_TEST_BAD", "not-a-number");
        assert!(matches!(
            parse_var::<usize>("CONSILIUM_TEST_BAD", 1),
            Err(ConfigError::InvalidValue(_, _))
        ));
        std::env::remove_var("CONSILIUM_TEST_BAD");
    }
}
