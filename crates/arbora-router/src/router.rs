//! Two-tier routing state machine
//!
//! Deterministic tier first; the backstop is consulted only on NONE and its
//! prediction is accepted only above the confidence threshold. Low
//! confidence (or a backstop NONE) downgrades to CLARIFY. A backstop
//! failure is a structured error, never a panic. No state is re-entered
//! within one turn.

use crate::deterministic::classify_service;
use arbora_domain::{BackstopClassifier, Section, ServiceKind};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Default acceptance threshold for the backstop classifier
pub const DEFAULT_BACKSTOP_MIN_CONFIDENCE: f64 = 0.60;

/// Which tier produced the final decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSource {
    /// The lexicon classifier hit; the backstop was never invoked
    Deterministic,
    /// The backstop prediction was accepted
    Backstop,
    /// Neither tier produced an acceptable decision
    Clarify,
}

/// The routing decision returned to the coordinator (logged, never persisted
/// in the record)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingDecision {
    /// Resolved service (`CLARIFY` when ambiguous)
    pub service: ServiceKind,
    /// Resolved section, when the service is section-scoped
    pub section: Option<Section>,
    /// Backstop confidence, when the backstop ran
    pub confidence: Option<f64>,
    /// Which tier decided
    pub source: RouteSource,
    /// Explanation for clarify decisions
    pub note: Option<String>,
}

/// Routing failed in a way the coordinator must surface as an error
#[derive(Debug, Error)]
pub enum RouterError {
    /// The backstop classifier was unavailable or raised
    #[error("backstop classifier failed: {0}")]
    BackstopUnavailable(String),
}

/// Two-tier service router
pub struct ServiceRouter<B: BackstopClassifier> {
    backstop: B,
    min_confidence: f64,
}

impl<B: BackstopClassifier> ServiceRouter<B> {
    /// Create a router with the given backstop and acceptance threshold
    pub fn new(backstop: B, min_confidence: f64) -> ServiceRouter<B> {
        ServiceRouter {
            backstop,
            min_confidence,
        }
    }

    /// Create a router with the default threshold
    pub fn with_default_threshold(backstop: B) -> ServiceRouter<B> {
        ServiceRouter::new(backstop, DEFAULT_BACKSTOP_MIN_CONFIDENCE)
    }

    /// The configured acceptance threshold
    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    /// Route one action request
    pub fn route(&self, utterance: &str) -> Result<RoutingDecision, RouterError> {
        let (service, section) = classify_service(utterance);
        if service != ServiceKind::None {
            debug!(service = %service, "deterministic router hit");
            return Ok(RoutingDecision {
                service,
                section,
                confidence: None,
                source: RouteSource::Deterministic,
                note: None,
            });
        }

        let prediction = self
            .backstop
            .classify(utterance)
            .map_err(RouterError::BackstopUnavailable)?;

        let confidence = prediction.confidence.clamp(0.0, 1.0);
        let accept = confidence >= self.min_confidence
            && prediction.service != ServiceKind::None
            && prediction.service != ServiceKind::Clarify;

        if accept {
            debug!(service = %prediction.service, confidence, "backstop accepted");
            return Ok(RoutingDecision {
                service: prediction.service,
                section: prediction.section,
                confidence: Some(confidence),
                source: RouteSource::Backstop,
                note: None,
            });
        }

        warn!(confidence, threshold = self.min_confidence, "backstop below threshold, clarifying");
        Ok(RoutingDecision {
            service: ServiceKind::Clarify,
            section: None,
            confidence: Some(confidence),
            source: RouteSource::Clarify,
            note: Some(format!(
                "request was ambiguous (backstop confidence {:.2} below {:.2}); \
                 specify a section summary, an outline, a full draft, or a correction",
                confidence, self.min_confidence
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbora_domain::BackstopPrediction;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Minimal scripted backstop; the full-featured mock lives in arbora-llm
    struct ScriptedBackstop {
        response: Result<BackstopPrediction, String>,
        calls: AtomicUsize,
    }

    impl ScriptedBackstop {
        fn new(response: Result<BackstopPrediction, String>) -> Self {
            ScriptedBackstop {
                response,
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl BackstopClassifier for &ScriptedBackstop {
        fn classify(&self, _utterance: &str) -> Result<BackstopPrediction, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone()
        }
    }

    fn prediction(service: ServiceKind, confidence: f64) -> BackstopPrediction {
        BackstopPrediction {
            service,
            section: Some(Section::Risks),
            confidence,
        }
    }

    #[test]
    fn test_deterministic_hit_never_calls_backstop() {
        let backstop = ScriptedBackstop::new(Ok(prediction(ServiceKind::SectionSummary, 0.99)));
        let router = ServiceRouter::with_default_threshold(&backstop);

        let decision = router.route("summarize the risks").unwrap();
        assert_eq!(decision.service, ServiceKind::SectionSummary);
        assert_eq!(decision.section, Some(Section::Risks));
        assert_eq!(decision.source, RouteSource::Deterministic);
        assert_eq!(backstop.call_count(), 0);
    }

    #[test]
    fn test_backstop_accepted_above_threshold() {
        let backstop = ScriptedBackstop::new(Ok(prediction(ServiceKind::SectionSummary, 0.85)));
        let router = ServiceRouter::with_default_threshold(&backstop);

        let decision = router.route("could you condense what we know about failures").unwrap();
        assert_eq!(decision.service, ServiceKind::SectionSummary);
        assert_eq!(decision.source, RouteSource::Backstop);
        assert_eq!(decision.confidence, Some(0.85));
        assert_eq!(backstop.call_count(), 1);
    }

    #[test]
    fn test_low_confidence_downgrades_to_clarify() {
        let backstop = ScriptedBackstop::new(Ok(prediction(ServiceKind::SectionSummary, 0.3)));
        let router = ServiceRouter::with_default_threshold(&backstop);

        let decision = router.route("hmm can you do the thing").unwrap();
        assert_eq!(decision.service, ServiceKind::Clarify);
        assert_eq!(decision.section, None);
        assert_eq!(decision.source, RouteSource::Clarify);
        assert!(decision.note.as_deref().unwrap_or("").contains("ambiguous"));
    }

    #[test]
    fn test_backstop_none_downgrades_to_clarify() {
        let backstop = ScriptedBackstop::new(Ok(prediction(ServiceKind::None, 0.95)));
        let router = ServiceRouter::with_default_threshold(&backstop);

        let decision = router.route("hmm can you do the thing").unwrap();
        assert_eq!(decision.service, ServiceKind::Clarify);
    }

    #[test]
    fn test_backstop_failure_is_structured_error() {
        let backstop = ScriptedBackstop::new(Err("connection refused".to_string()));
        let router = ServiceRouter::with_default_threshold(&backstop);

        let err = router.route("hmm can you do the thing").unwrap_err();
        assert!(matches!(err, RouterError::BackstopUnavailable(_)));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_custom_threshold() {
        let backstop = ScriptedBackstop::new(Ok(prediction(ServiceKind::Outline, 0.5)));
        let router = ServiceRouter::new(&backstop, 0.4);

        let decision = router.route("hmm can you do the thing").unwrap();
        assert_eq!(decision.service, ServiceKind::Outline);
        assert_eq!(decision.source, RouteSource::Backstop);
    }
}
