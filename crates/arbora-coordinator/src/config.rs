//! Coordinator configuration
//!
//! Loaded from a TOML file with environment overrides for the backstop
//! threshold (`ARBORA_BACKSTOP_MIN_CONF`) and the turn log path
//! (`ARBORA_TURN_LOG`).

use arbora_router::DEFAULT_BACKSTOP_MIN_CONFIDENCE;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Environment variable overriding the backstop acceptance threshold
pub const ENV_BACKSTOP_MIN_CONF: &str = "ARBORA_BACKSTOP_MIN_CONF";

/// Environment variable overriding the turn log path
pub const ENV_TURN_LOG: &str = "ARBORA_TURN_LOG";

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// An environment override had an unusable value
    #[error("invalid value for {variable}: {value}")]
    InvalidOverride {
        /// Offending variable name
        variable: &'static str,
        /// Offending value
        value: String,
    },
}

/// Coordinator configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorConfig {
    /// Minimum backstop confidence to accept its routing decision
    #[serde(default = "default_backstop_min_confidence")]
    pub backstop_min_confidence: f64,

    /// Turn log file (JSONL, appended)
    #[serde(default = "default_turn_log_path")]
    pub turn_log_path: String,

    /// Ollama API endpoint
    #[serde(default = "default_ollama_endpoint")]
    pub ollama_endpoint: String,

    /// Ollama model name
    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,
}

fn default_backstop_min_confidence() -> f64 {
    DEFAULT_BACKSTOP_MIN_CONFIDENCE
}

fn default_turn_log_path() -> String {
    "arbora_turns.jsonl".to_string()
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1".to_string()
}

impl CoordinatorConfig {
    /// Load configuration from a TOML file and apply environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: CoordinatorConfig = toml::from_str(&contents)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Default configuration for testing
    pub fn default_test_config() -> Self {
        CoordinatorConfig {
            backstop_min_confidence: DEFAULT_BACKSTOP_MIN_CONFIDENCE,
            turn_log_path: default_turn_log_path(),
            ollama_endpoint: default_ollama_endpoint(),
            ollama_model: default_ollama_model(),
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(raw) = std::env::var(ENV_BACKSTOP_MIN_CONF) {
            let parsed: f64 = raw.parse().map_err(|_| ConfigError::InvalidOverride {
                variable: ENV_BACKSTOP_MIN_CONF,
                value: raw.clone(),
            })?;
            if !(0.0..=1.0).contains(&parsed) {
                return Err(ConfigError::InvalidOverride {
                    variable: ENV_BACKSTOP_MIN_CONF,
                    value: raw,
                });
            }
            self.backstop_min_confidence = parsed;
        }
        if let Ok(path) = std::env::var(ENV_TURN_LOG) {
            self.turn_log_path = path;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoordinatorConfig::default_test_config();
        assert_eq!(config.backstop_min_confidence, 0.60);
        assert_eq!(config.turn_log_path, "arbora_turns.jsonl");
        assert_eq!(config.ollama_endpoint, "http://localhost:11434");
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            backstop_min_confidence = 0.75
            turn_log_path = "/var/log/arbora/turns.jsonl"
            ollama_endpoint = "http://10.0.0.5:11434"
            ollama_model = "mistral"
        "#;
        let config: CoordinatorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.backstop_min_confidence, 0.75);
        assert_eq!(config.turn_log_path, "/var/log/arbora/turns.jsonl");
        assert_eq!(config.ollama_model, "mistral");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CoordinatorConfig = toml::from_str("ollama_model = \"phi3\"").unwrap();
        assert_eq!(config.backstop_min_confidence, 0.60);
        assert_eq!(config.ollama_model, "phi3");
    }
}
