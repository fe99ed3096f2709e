//! Ollama adapter implementations
//!
//! Talks to a local Ollama instance over its generate API with JSON output
//! mode, bounded retries, and timeouts. The coordinator is synchronous, so
//! the client uses blocking HTTP.

use crate::parse::{parse_backstop, parse_envelope, parse_intent};
use crate::prompt::{backstop_prompt, extraction_prompt, intent_prompt};
use crate::LlmError;
use arbora_domain::{
    BackstopClassifier, BackstopPrediction, Intent, IntentClassifier, Section, SectionExtractor,
    UpdateEnvelope,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for model requests (30 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Blocking client for the Ollama generate API
pub struct OllamaClient {
    endpoint: String,
    model: String,
    client: reqwest::blocking::Client,
    max_retries: u32,
}

#[derive(Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    format: String,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    #[allow(dead_code)]
    done: bool,
}

impl OllamaClient {
    /// Create a client for the given endpoint and model
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::Communication(format!("client build failed: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            model: model.into(),
            client,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Create a client against `http://localhost:11434`
    pub fn default_endpoint(model: impl Into<String>) -> Result<Self, LlmError> {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    /// Set the maximum number of retry attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Generate a JSON completion for `prompt`
    ///
    /// Retries transient failures with exponential backoff (1s, 2s, 4s).
    /// A missing model is not retried.
    pub fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.endpoint);
        let request_body = OllamaGenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            format: "json".to_string(),
        };

        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.max_retries {
            match self.client.post(&url).json(&request_body).send() {
                Ok(response) => {
                    if response.status().is_success() {
                        return match response.json::<OllamaGenerateResponse>() {
                            Ok(body) => Ok(body.response),
                            Err(e) => Err(LlmError::InvalidResponse(format!(
                                "failed to parse response: {}",
                                e
                            ))),
                        };
                    } else if response.status() == reqwest::StatusCode::NOT_FOUND {
                        return Err(LlmError::ModelNotAvailable(self.model.clone()));
                    } else {
                        let status = response.status();
                        let error_text = response
                            .text()
                            .unwrap_or_else(|_| "unknown error".to_string());
                        last_error = Some(LlmError::Communication(format!(
                            "HTTP {}: {}",
                            status, error_text
                        )));
                    }
                }
                Err(e) => {
                    last_error = Some(LlmError::Communication(format!("request failed: {}", e)));
                }
            }

            attempts += 1;
            if attempts < self.max_retries {
                let delay = Duration::from_secs(2u64.pow(attempts - 1));
                warn!(attempt = attempts, "ollama request failed, retrying");
                std::thread::sleep(delay);
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Communication("max retries exceeded".to_string())))
    }
}

/// Intent classifier backed by an Ollama model
pub struct OllamaIntentClassifier {
    client: OllamaClient,
}

impl OllamaIntentClassifier {
    /// Wrap an Ollama client
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }
}

impl IntentClassifier for OllamaIntentClassifier {
    fn classify(&self, utterance: &str) -> Result<Intent, String> {
        let response = self
            .client
            .generate(&intent_prompt(utterance))
            .map_err(|e| e.to_string())?;
        parse_intent(&response).map_err(|e| e.to_string())
    }
}

/// Section extractor backed by an Ollama model
///
/// `corrections_tuned` builds one with replacement-value framing, for the
/// correction service.
pub struct OllamaSectionExtractor {
    client: OllamaClient,
    correction: bool,
    name: String,
}

impl OllamaSectionExtractor {
    /// Extractor for normal fact capture
    pub fn new(client: OllamaClient) -> Self {
        Self {
            client,
            correction: false,
            name: "ollama".to_string(),
        }
    }

    /// Extractor tuned for corrections
    pub fn corrections_tuned(client: OllamaClient) -> Self {
        Self {
            client,
            correction: true,
            name: "ollama-corrections".to_string(),
        }
    }
}

impl SectionExtractor for OllamaSectionExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, section: Section, payload: &str) -> Result<UpdateEnvelope, String> {
        let response = self
            .client
            .generate(&extraction_prompt(section, payload, self.correction))
            .map_err(|e| e.to_string())?;
        parse_envelope(&response).map_err(|e| e.to_string())
    }
}

/// Backstop service classifier backed by an Ollama model
pub struct OllamaBackstop {
    client: OllamaClient,
}

impl OllamaBackstop {
    /// Wrap an Ollama client
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }
}

impl BackstopClassifier for OllamaBackstop {
    fn classify(&self, utterance: &str) -> Result<BackstopPrediction, String> {
        let response = self
            .client
            .generate(&backstop_prompt(utterance))
            .map_err(|e| e.to_string())?;
        parse_backstop(&response).map_err(|e| e.to_string())
    }
}
