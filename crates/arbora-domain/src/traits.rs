//! Trait seams for external classification and extraction services
//!
//! These ports keep LLM calls out of the coordinator's business logic: the
//! live adapters talk to a model over the network, the test doubles return
//! scripted envelopes. Errors cross the seam as plain strings and are
//! wrapped into typed errors by the calling crate.

use crate::envelope::UpdateEnvelope;
use crate::section::Section;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a single utterance means at the top level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    /// The operator is supplying factual content for the record
    #[serde(rename = "PROVIDE_STATEMENT")]
    ProvideStatement,
    /// The operator is asking for an action (summary, draft, correction)
    #[serde(rename = "REQUEST_SERVICE")]
    RequestService,
}

/// Services an action request can resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceKind {
    /// Single-section correction with overwrite semantics
    #[serde(rename = "MAKE_CORRECTION")]
    MakeCorrection,
    /// Prose summary of one section
    #[serde(rename = "SECTION_SUMMARY")]
    SectionSummary,
    /// Short whole-record summary
    #[serde(rename = "QUICK_SUMMARY")]
    QuickSummary,
    /// Bullet outline (explicit "outline" keyword only)
    #[serde(rename = "OUTLINE")]
    Outline,
    /// Full report draft
    #[serde(rename = "MAKE_REPORT_DRAFT")]
    MakeReportDraft,
    /// Sentinel: insufficient signal to choose, ask the operator
    #[serde(rename = "CLARIFY")]
    Clarify,
    /// Deterministic tier found nothing; try the backstop
    #[serde(rename = "NONE")]
    None,
}

impl ServiceKind {
    /// Wire label, matching the classifier contract
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::MakeCorrection => "MAKE_CORRECTION",
            ServiceKind::SectionSummary => "SECTION_SUMMARY",
            ServiceKind::QuickSummary => "QUICK_SUMMARY",
            ServiceKind::Outline => "OUTLINE",
            ServiceKind::MakeReportDraft => "MAKE_REPORT_DRAFT",
            ServiceKind::Clarify => "CLARIFY",
            ServiceKind::None => "NONE",
        }
    }

    /// Parse a wire label
    pub fn parse(s: &str) -> Option<ServiceKind> {
        match s.trim().to_uppercase().as_str() {
            "MAKE_CORRECTION" => Some(ServiceKind::MakeCorrection),
            "SECTION_SUMMARY" => Some(ServiceKind::SectionSummary),
            "QUICK_SUMMARY" => Some(ServiceKind::QuickSummary),
            "OUTLINE" => Some(ServiceKind::Outline),
            "MAKE_REPORT_DRAFT" => Some(ServiceKind::MakeReportDraft),
            "CLARIFY" => Some(ServiceKind::Clarify),
            "NONE" => Some(ServiceKind::None),
            _ => None,
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the backstop classification service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackstopPrediction {
    /// Predicted service
    pub service: ServiceKind,
    /// Predicted section, when the service is section-scoped
    pub section: Option<Section>,
    /// Confidence in [0, 1]
    pub confidence: f64,
}

/// Decides between providing a statement and requesting a service
pub trait IntentClassifier {
    /// Classify one raw utterance
    fn classify(&self, utterance: &str) -> Result<Intent, String>;
}

/// Turns one scoped payload into a canonical update envelope
///
/// Implementations must be idempotent and side-effect-free; any schema
/// violation in the returned envelope is treated as an extraction failure
/// by the coordinator.
pub trait SectionExtractor {
    /// Stable identity recorded in provenance rows
    fn name(&self) -> &str;

    /// Extract field updates from a free-text payload scoped to `section`
    fn extract(&self, section: Section, payload: &str) -> Result<UpdateEnvelope, String>;
}

/// Learned classifier invoked only when deterministic routing returns NONE
pub trait BackstopClassifier {
    /// Classify one raw utterance into (service, section, confidence)
    fn classify(&self, utterance: &str) -> Result<BackstopPrediction, String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_kind_roundtrip() {
        for kind in [
            ServiceKind::MakeCorrection,
            ServiceKind::SectionSummary,
            ServiceKind::QuickSummary,
            ServiceKind::Outline,
            ServiceKind::MakeReportDraft,
            ServiceKind::Clarify,
            ServiceKind::None,
        ] {
            assert_eq!(ServiceKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ServiceKind::parse("lowercase_nonsense"), None);
    }

    #[test]
    fn test_intent_wire_labels() {
        let json = serde_json::to_string(&Intent::ProvideStatement).unwrap();
        assert_eq!(json, "\"PROVIDE_STATEMENT\"");
        let back: Intent = serde_json::from_str("\"REQUEST_SERVICE\"").unwrap();
        assert_eq!(back, Intent::RequestService);
    }
}
