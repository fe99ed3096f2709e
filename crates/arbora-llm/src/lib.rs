//! Arbora Classification and Extraction Adapters
//!
//! Implementations of the classification and extraction ports from
//! `arbora-domain`. Two families:
//!
//! - `Mock*`: deterministic scripted doubles for testing, no network
//! - `Ollama*`: adapters over a local Ollama API via [`OllamaClient`]
//!
//! # Examples
//!
//! ```
//! use arbora_llm::MockIntentClassifier;
//! use arbora_domain::{Intent, IntentClassifier};
//!
//! let classifier = MockIntentClassifier::new(Intent::ProvideStatement);
//! assert_eq!(classifier.classify("dbh is 26").unwrap(), Intent::ProvideStatement);
//! assert_eq!(classifier.call_count(), 1);
//! ```

#![warn(missing_docs)]

pub mod ollama;
pub mod parse;
pub mod prompt;

use arbora_domain::{
    BackstopClassifier, BackstopPrediction, Intent, IntentClassifier, Section, SectionExtractor,
    ServiceKind, UpdateEnvelope,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use ollama::{
    OllamaBackstop, OllamaClient, OllamaIntentClassifier, OllamaSectionExtractor,
    DEFAULT_ENDPOINT, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS,
};

/// Errors that can occur talking to a model backend
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("communication error: {0}")]
    Communication(String),

    /// The model returned something the adapter cannot parse
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Requested model is not loaded on the backend
    #[error("model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("llm error: {0}")]
    Other(String),
}

/// Scripted intent classifier for deterministic testing
///
/// Returns pre-configured intents keyed by exact utterance, with a default
/// for everything else, and counts calls so tests can assert how often the
/// seam was crossed.
#[derive(Debug, Clone)]
pub struct MockIntentClassifier {
    default_intent: Intent,
    scripted: Arc<Mutex<HashMap<String, Intent>>>,
    errors: Arc<Mutex<Vec<String>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockIntentClassifier {
    /// Create a classifier returning `default_intent` for every utterance
    pub fn new(default_intent: Intent) -> Self {
        Self {
            default_intent,
            scripted: Arc::new(Mutex::new(HashMap::new())),
            errors: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Script a specific intent for an exact utterance
    pub fn add_intent(&mut self, utterance: impl Into<String>, intent: Intent) {
        self.scripted.lock().unwrap().insert(utterance.into(), intent);
    }

    /// Make classification fail for an exact utterance
    pub fn add_error(&mut self, utterance: impl Into<String>) {
        self.errors.lock().unwrap().push(utterance.into());
    }

    /// Number of times `classify` was called
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockIntentClassifier {
    fn default() -> Self {
        Self::new(Intent::ProvideStatement)
    }
}

impl IntentClassifier for MockIntentClassifier {
    fn classify(&self, utterance: &str) -> Result<Intent, String> {
        *self.call_count.lock().unwrap() += 1;
        if self.errors.lock().unwrap().iter().any(|u| u == utterance) {
            return Err("mock intent error".to_string());
        }
        Ok(self
            .scripted
            .lock()
            .unwrap()
            .get(utterance)
            .copied()
            .unwrap_or(self.default_intent))
    }
}

/// Scripted section extractor for deterministic testing
///
/// Returns pre-configured envelopes keyed by exact payload text and records
/// every `(section, payload)` pair it is asked about, so tests can assert
/// that navigation-only segments never reach the extractor.
#[derive(Debug, Clone)]
pub struct MockExtractor {
    name: String,
    default_envelope: UpdateEnvelope,
    scripted: Arc<Mutex<HashMap<String, UpdateEnvelope>>>,
    errors: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<(Section, String)>>>,
}

impl MockExtractor {
    /// Create an extractor returning an empty envelope for every payload
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_envelope: UpdateEnvelope::new(),
            scripted: Arc::new(Mutex::new(HashMap::new())),
            errors: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the envelope returned for unscripted payloads
    pub fn with_default(mut self, envelope: UpdateEnvelope) -> Self {
        self.default_envelope = envelope;
        self
    }

    /// Script a specific envelope for an exact payload
    pub fn add_envelope(&mut self, payload: impl Into<String>, envelope: UpdateEnvelope) {
        self.scripted.lock().unwrap().insert(payload.into(), envelope);
    }

    /// Make extraction fail for an exact payload
    pub fn add_error(&mut self, payload: impl Into<String>) {
        self.errors.lock().unwrap().push(payload.into());
    }

    /// Number of times `extract` was called
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Every `(section, payload)` pair seen so far
    pub fn calls(&self) -> Vec<(Section, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl SectionExtractor for MockExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, section: Section, payload: &str) -> Result<UpdateEnvelope, String> {
        self.calls.lock().unwrap().push((section, payload.to_string()));
        if self.errors.lock().unwrap().iter().any(|p| p == payload) {
            return Err("mock extraction error".to_string());
        }
        Ok(self
            .scripted
            .lock()
            .unwrap()
            .get(payload)
            .cloned()
            .unwrap_or_else(|| self.default_envelope.clone()))
    }
}

/// Scripted backstop classifier for deterministic testing
#[derive(Debug, Clone)]
pub struct MockBackstop {
    default_prediction: BackstopPrediction,
    scripted: Arc<Mutex<HashMap<String, BackstopPrediction>>>,
    errors: Arc<Mutex<Vec<String>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockBackstop {
    /// Create a backstop returning `default_prediction` for every utterance
    pub fn new(default_prediction: BackstopPrediction) -> Self {
        Self {
            default_prediction,
            scripted: Arc::new(Mutex::new(HashMap::new())),
            errors: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Script a specific prediction for an exact utterance
    pub fn add_prediction(&mut self, utterance: impl Into<String>, prediction: BackstopPrediction) {
        self.scripted.lock().unwrap().insert(utterance.into(), prediction);
    }

    /// Make classification fail for an exact utterance
    pub fn add_error(&mut self, utterance: impl Into<String>) {
        self.errors.lock().unwrap().push(utterance.into());
    }

    /// Number of times `classify` was called
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockBackstop {
    fn default() -> Self {
        Self::new(BackstopPrediction {
            service: ServiceKind::None,
            section: None,
            confidence: 0.0,
        })
    }
}

impl BackstopClassifier for MockBackstop {
    fn classify(&self, utterance: &str) -> Result<BackstopPrediction, String> {
        *self.call_count.lock().unwrap() += 1;
        if self.errors.lock().unwrap().iter().any(|u| u == utterance) {
            return Err("mock backstop error".to_string());
        }
        Ok(self
            .scripted
            .lock()
            .unwrap()
            .get(utterance)
            .cloned()
            .unwrap_or_else(|| self.default_prediction.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbora_domain::FieldValue;

    #[test]
    fn test_mock_intent_scripted_and_default() {
        let mut classifier = MockIntentClassifier::new(Intent::ProvideStatement);
        classifier.add_intent("summarize the risks", Intent::RequestService);

        assert_eq!(
            classifier.classify("summarize the risks").unwrap(),
            Intent::RequestService
        );
        assert_eq!(
            classifier.classify("dbh is 26 inches").unwrap(),
            Intent::ProvideStatement
        );
        assert_eq!(classifier.call_count(), 2);
    }

    #[test]
    fn test_mock_intent_error() {
        let mut classifier = MockIntentClassifier::default();
        classifier.add_error("garbled");
        assert!(classifier.classify("garbled").is_err());
    }

    #[test]
    fn test_mock_extractor_records_calls() {
        let mut extractor = MockExtractor::new("mock");
        extractor.add_envelope(
            "dbh is 26 inches",
            UpdateEnvelope::new().with("tree_description.dbh_in", FieldValue::text("26")),
        );

        let envelope = extractor
            .extract(Section::TreeDescription, "dbh is 26 inches")
            .unwrap();
        assert_eq!(envelope.provided_paths(), vec!["tree_description.dbh_in"]);
        assert_eq!(
            extractor.calls(),
            vec![(Section::TreeDescription, "dbh is 26 inches".to_string())]
        );
    }

    #[test]
    fn test_mock_extractor_default_is_empty() {
        let extractor = MockExtractor::new("mock");
        let envelope = extractor.extract(Section::Risks, "anything").unwrap();
        assert!(envelope.is_empty());
        assert_eq!(extractor.call_count(), 1);
    }

    #[test]
    fn test_mock_extractor_error() {
        let mut extractor = MockExtractor::new("mock");
        extractor.add_error("bad payload");
        assert!(extractor.extract(Section::Targets, "bad payload").is_err());
        // failed calls are still recorded
        assert_eq!(extractor.call_count(), 1);
    }

    #[test]
    fn test_mock_backstop_clone_shares_counts() {
        let backstop = MockBackstop::default();
        let clone = backstop.clone();
        backstop.classify("anything").unwrap();
        assert_eq!(clone.call_count(), 1);
    }

    #[test]
    fn test_mock_backstop_scripted() {
        let mut backstop = MockBackstop::default();
        backstop.add_prediction(
            "condense the failure notes",
            BackstopPrediction {
                service: ServiceKind::SectionSummary,
                section: Some(Section::Risks),
                confidence: 0.82,
            },
        );

        let prediction = backstop.classify("condense the failure notes").unwrap();
        assert_eq!(prediction.service, ServiceKind::SectionSummary);
        assert_eq!(prediction.confidence, 0.82);
    }
}
