//! Turn result contract returned to the caller and written to the turn log

use arbora_domain::{ProvenanceRow, Section};
use arbora_router::RoutingDecision;
use serde::Serialize;

/// How the turn was routed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRoute {
    /// Factual content captured into the record
    ProvideStatement,
    /// Action request resolved to a service
    RequestService,
    /// Context guard short-circuited the turn
    BlockedContextEdit,
    /// Routing could not resolve a service
    Clarify,
    /// The turn failed
    Error,
}

/// Per-segment visibility in the turn result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentNote {
    /// Resolved scope
    pub section: Section,
    /// Payload text sent to extraction (empty for navigation)
    pub payload: String,
    /// Marker with no payload; inert by policy
    pub navigation_only: bool,
    /// At least one field applied from this segment
    pub captured: bool,
}

/// Error kind and message embedded in a failed turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    /// Stable short kind ("extraction_failure", "classification_failure")
    pub kind: String,
    /// Human-readable message
    pub message: String,
}

/// Everything one turn produced
#[derive(Debug, Clone, Serialize)]
pub struct TurnResult {
    /// Correlation id, also stamped on provenance rows
    pub turn_id: String,
    /// The raw utterance as received
    pub utterance: String,
    /// False only for classification/extraction failures
    pub ok: bool,
    /// Route taken
    pub route: TurnRoute,
    /// Short explanatory note (clarify reason, no_capture, guard note)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Dotted paths that changed this turn
    pub applied_paths: Vec<String>,
    /// Provenance rows emitted this turn
    pub rows: Vec<ProvenanceRow>,
    /// Segments seen this turn, in parse order
    pub segments: Vec<SegmentNote>,
    /// Routing decision detail, for request-service turns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing: Option<RoutingDecision>,
    /// Error detail, for failed turns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl TurnResult {
    /// Empty scaffold for one turn; fields are filled in as the turn runs
    pub fn new(turn_id: impl Into<String>, utterance: impl Into<String>) -> TurnResult {
        TurnResult {
            turn_id: turn_id.into(),
            utterance: utterance.into(),
            ok: true,
            route: TurnRoute::ProvideStatement,
            note: None,
            applied_paths: Vec::new(),
            rows: Vec::new(),
            segments: Vec::new(),
            routing: None,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_without_empty_optionals() {
        let result = TurnResult::new("turn-abc123def456", "dbh is 26");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["route"], "provide_statement");
        assert!(json.get("note").is_none());
        assert!(json.get("error").is_none());
    }
}
