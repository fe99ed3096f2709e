//! End-to-end coordinator tests with scripted classification and extraction

use arbora_coordinator::{Coordinator, ExtractorRegistry, TurnLog, TurnRoute};
use arbora_domain::{
    BackstopPrediction, FieldValue, Intent, JobContext, Section, ServiceKind, UpdateEnvelope,
};
use arbora_guard::ContextGuard;
use arbora_llm::{MockBackstop, MockExtractor, MockIntentClassifier};
use arbora_router::{RouteSource, ServiceRouter};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

struct Harness {
    coordinator: Coordinator<MockIntentClassifier, MockBackstop>,
    intent: MockIntentClassifier,
    extractor: MockExtractor,
    corrections: MockExtractor,
    backstop: MockBackstop,
    log_path: PathBuf,
    _dir: TempDir,
}

fn harness() -> Harness {
    let intent = MockIntentClassifier::new(Intent::ProvideStatement);
    let extractor = MockExtractor::new("mock");
    let corrections = MockExtractor::new("mock-corrections");
    let backstop = MockBackstop::default();
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("turns.jsonl");

    let coordinator = Coordinator::new(
        JobContext::sample(),
        intent.clone(),
        ExtractorRegistry::uniform(Arc::new(extractor.clone())),
        Arc::new(corrections.clone()),
        ServiceRouter::with_default_threshold(backstop.clone()),
        ContextGuard::default_config(),
        TurnLog::new(&log_path),
    );

    Harness {
        coordinator,
        intent,
        extractor,
        corrections,
        backstop,
        log_path,
        _dir: dir,
    }
}

fn log_lines(h: &Harness) -> Vec<Value> {
    std::fs::read_to_string(&h.log_path)
        .unwrap_or_default()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[test]
fn test_explicit_marker_capture() {
    let mut h = harness();
    h.extractor.add_envelope(
        "dbh 26 in",
        UpdateEnvelope::new().with("tree_description.dbh_in", FieldValue::text("26")),
    );

    let result = h.coordinator.handle_turn("tree description: dbh 26 in");

    assert!(result.ok);
    assert_eq!(result.route, TurnRoute::ProvideStatement);
    assert_eq!(result.applied_paths, vec!["tree_description.dbh_in"]);
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].path, "tree_description.dbh_in");
    assert_eq!(result.rows[0].value, "26");
    assert_eq!(result.rows[0].turn_id, result.turn_id);
    assert_eq!(result.rows[0].extractor, "mock");
    assert_eq!(h.coordinator.record().tree_description.dbh_in, "26");
}

#[test]
fn test_navigation_only_marker_is_inert() {
    let mut h = harness();
    let before = h.coordinator.record().tree_description.clone();

    let result = h.coordinator.handle_turn("targets:");

    assert!(result.ok);
    assert_eq!(result.segments.len(), 1);
    assert!(result.segments[0].navigation_only);
    assert!(result.rows.is_empty());
    assert!(result.applied_paths.is_empty());
    // the extractor never ran and nothing merged
    assert_eq!(h.extractor.call_count(), 0);
    assert!(h.coordinator.record().provenance.is_empty());
    assert_eq!(h.coordinator.record().tree_description, before);
    // but the cursor moved
    assert_eq!(h.coordinator.record().cursor, Some(Section::Targets));
}

#[test]
fn test_cursor_fallback_scopes_unscoped_text() {
    let mut h = harness();
    h.extractor.add_envelope(
        "swing set near the drip line",
        UpdateEnvelope::new().with(
            "targets.items",
            FieldValue::list(vec![serde_json::json!({
                "label": "swing set",
                "proximity_note": "near the drip line"
            })]),
        ),
    );

    h.coordinator.handle_turn("targets:");
    let result = h.coordinator.handle_turn("swing set near the drip line");

    assert!(result.ok);
    assert_eq!(result.applied_paths, vec!["targets.items"]);
    assert_eq!(
        h.extractor.calls(),
        vec![(
            Section::Targets,
            "swing set near the drip line".to_string()
        )]
    );
    assert_eq!(h.coordinator.record().targets.items.len(), 1);
    assert_eq!(h.coordinator.record().targets.items[0].label, "swing set");
}

#[test]
fn test_unscoped_text_without_cursor_is_ignored() {
    let mut h = harness();

    let result = h.coordinator.handle_turn("bark inclusion at the main union");

    assert!(result.ok);
    assert!(result.segments.is_empty());
    assert!(result.note.as_deref().unwrap_or("").contains("no active section"));
    assert_eq!(h.extractor.call_count(), 0);
    assert!(h.coordinator.record().provenance.is_empty());
}

#[test]
fn test_multi_section_turn_preserves_order() {
    let mut h = harness();
    h.extractor.add_envelope(
        "vehicles in the lot.",
        UpdateEnvelope::new().with(
            "targets.narratives",
            FieldValue::list(vec![Value::String("vehicles in the lot".to_string())]),
        ),
    );
    h.extractor.add_envelope(
        "large deadwood overhead",
        UpdateEnvelope::new().with(
            "risks.narratives",
            FieldValue::list(vec![Value::String("large deadwood overhead".to_string())]),
        ),
    );

    let result = h
        .coordinator
        .handle_turn("targets: vehicles in the lot. risks: large deadwood overhead");

    assert!(result.ok);
    assert_eq!(
        result.applied_paths,
        vec!["targets.narratives", "risks.narratives"]
    );
    assert_eq!(
        h.extractor.calls(),
        vec![
            (Section::Targets, "vehicles in the lot.".to_string()),
            (Section::Risks, "large deadwood overhead".to_string()),
        ]
    );
    assert_eq!(h.coordinator.record().cursor, Some(Section::Risks));
}

#[test]
fn test_prefer_existing_never_overwrites_concrete_scalar() {
    let mut h = harness();
    h.extractor.add_envelope(
        "dbh 26 in",
        UpdateEnvelope::new().with("tree_description.dbh_in", FieldValue::text("26")),
    );
    h.extractor.add_envelope(
        "dbh 28 in",
        UpdateEnvelope::new().with("tree_description.dbh_in", FieldValue::text("28")),
    );

    h.coordinator.handle_turn("tree description: dbh 26 in");
    let second = h.coordinator.handle_turn("tree description: dbh 28 in");

    assert!(second.ok);
    assert!(second.applied_paths.is_empty());
    assert_eq!(second.note.as_deref(), Some("no_capture"));
    assert_eq!(second.rows.len(), 1);
    assert!(second.rows[0].is_not_found());
    assert_eq!(h.coordinator.record().tree_description.dbh_in, "26");
}

#[test]
fn test_correction_uses_last_write_and_dedups_provenance() {
    let mut h = harness();
    h.extractor.add_envelope(
        "dbh 26 in",
        UpdateEnvelope::new().with("tree_description.dbh_in", FieldValue::text("26")),
    );
    h.intent
        .add_intent("change dbh to 30 inches", Intent::RequestService);
    h.intent
        .add_intent("change dbh to 32 inches", Intent::RequestService);
    h.corrections.add_envelope(
        "change dbh to 30 inches",
        UpdateEnvelope::new().with("tree_description.dbh_in", FieldValue::text("30")),
    );
    h.corrections.add_envelope(
        "change dbh to 32 inches",
        UpdateEnvelope::new().with("tree_description.dbh_in", FieldValue::text("32")),
    );

    h.coordinator.handle_turn("tree description: dbh 26 in");
    let correction = h.coordinator.handle_turn("change dbh to 30 inches");

    assert!(correction.ok);
    assert_eq!(correction.route, TurnRoute::RequestService);
    let routing = correction.routing.unwrap();
    assert_eq!(routing.service, ServiceKind::MakeCorrection);
    assert_eq!(routing.source, RouteSource::Deterministic);
    assert_eq!(h.coordinator.record().tree_description.dbh_in, "30");

    h.coordinator.handle_turn("change dbh to 32 inches");
    assert_eq!(h.coordinator.record().tree_description.dbh_in, "32");

    // exactly one provenance row for the corrected path, carrying the latest
    // value
    let rows: Vec<_> = h
        .coordinator
        .record()
        .provenance
        .iter()
        .filter(|r| r.path == "tree_description.dbh_in")
        .collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value, "32");
    assert_eq!(rows[0].extractor, "mock-corrections");
}

#[test]
fn test_deterministic_summary_never_calls_backstop() {
    let mut h = harness();
    h.intent
        .add_intent("summarize the risks", Intent::RequestService);

    let result = h.coordinator.handle_turn("summarize the risks");

    assert!(result.ok);
    assert_eq!(result.route, TurnRoute::RequestService);
    let routing = result.routing.unwrap();
    assert_eq!(routing.service, ServiceKind::SectionSummary);
    assert_eq!(routing.section, Some(Section::Risks));
    assert_eq!(routing.source, RouteSource::Deterministic);
    assert_eq!(h.backstop.call_count(), 0);
    assert!(h.coordinator.record().provenance.is_empty());
}

#[test]
fn test_low_confidence_backstop_routes_to_clarify() {
    let mut h = harness();
    h.intent
        .add_intent("hmm can you do the thing", Intent::RequestService);
    h.backstop.add_prediction(
        "hmm can you do the thing",
        BackstopPrediction {
            service: ServiceKind::SectionSummary,
            section: Some(Section::Risks),
            confidence: 0.3,
        },
    );

    let result = h.coordinator.handle_turn("hmm can you do the thing");

    assert!(result.ok);
    assert_eq!(result.route, TurnRoute::Clarify);
    assert!(result.note.is_some());
    let routing = result.routing.unwrap();
    assert_eq!(routing.service, ServiceKind::Clarify);
    assert_eq!(routing.confidence, Some(0.3));
    assert!(h.coordinator.record().provenance.is_empty());
}

#[test]
fn test_accepted_backstop_section_summary() {
    let mut h = harness();
    h.intent
        .add_intent("condense what we know about failures", Intent::RequestService);
    h.backstop.add_prediction(
        "condense what we know about failures",
        BackstopPrediction {
            service: ServiceKind::SectionSummary,
            section: Some(Section::Risks),
            confidence: 0.9,
        },
    );

    let result = h.coordinator.handle_turn("condense what we know about failures");

    assert!(result.ok);
    assert_eq!(result.route, TurnRoute::RequestService);
    let routing = result.routing.unwrap();
    assert_eq!(routing.source, RouteSource::Backstop);
    assert_eq!(routing.section, Some(Section::Risks));
    assert_eq!(h.backstop.call_count(), 1);
}

#[test]
fn test_guard_blocks_before_intent_classification() {
    let mut h = harness();

    let result = h
        .coordinator
        .handle_turn("change the customer phone to 555-1234");

    assert!(result.ok);
    assert_eq!(result.route, TurnRoute::BlockedContextEdit);
    assert!(result.note.as_deref().unwrap_or("").contains("read-only"));
    assert_eq!(h.intent.call_count(), 0);
    assert_eq!(h.extractor.call_count(), 0);
    assert!(h.coordinator.record().provenance.is_empty());
}

#[test]
fn test_site_mention_of_guarded_noun_is_not_blocked() {
    let mut h = harness();
    h.extractor.add_envelope(
        "vehicles in the customer parking lot",
        UpdateEnvelope::new().with(
            "targets.narratives",
            FieldValue::list(vec![Value::String(
                "vehicles in the customer parking lot".to_string(),
            )]),
        ),
    );

    let result = h
        .coordinator
        .handle_turn("targets: vehicles in the customer parking lot");

    assert!(result.ok);
    assert_eq!(result.route, TurnRoute::ProvideStatement);
    assert_eq!(result.applied_paths, vec!["targets.narratives"]);
}

#[test]
fn test_extractor_failure_marks_turn_not_ok_without_mutation() {
    let mut h = harness();
    h.extractor.add_error("garbled audio here");

    let result = h.coordinator.handle_turn("risks: garbled audio here");

    assert!(!result.ok);
    assert_eq!(result.route, TurnRoute::Error);
    let error = result.error.unwrap();
    assert_eq!(error.kind, "extraction_failure");
    assert!(h.coordinator.record().provenance.is_empty());
}

#[test]
fn test_failure_in_later_segment_keeps_earlier_merges() {
    let mut h = harness();
    h.extractor.add_envelope(
        "playset by the fence.",
        UpdateEnvelope::new().with(
            "targets.narratives",
            FieldValue::list(vec![Value::String("playset by the fence".to_string())]),
        ),
    );
    h.extractor.add_error("garbled");

    let result = h.coordinator.handle_turn("targets: playset by the fence. risks: garbled");

    assert!(!result.ok);
    assert_eq!(result.applied_paths, vec!["targets.narratives"]);
    assert_eq!(h.coordinator.record().targets.narratives.len(), 1);
    assert!(h.coordinator.record().risks.narratives.is_empty());
}

#[test]
fn test_intent_classifier_failure() {
    let mut h = harness();
    h.intent.add_error("static noise");

    let result = h.coordinator.handle_turn("static noise");

    assert!(!result.ok);
    assert_eq!(result.route, TurnRoute::Error);
    assert_eq!(result.error.unwrap().kind, "classification_failure");
    assert!(h.coordinator.record().provenance.is_empty());
}

#[test]
fn test_backstop_failure_is_caught_at_the_turn_boundary() {
    let mut h = harness();
    h.intent
        .add_intent("do something unclassifiable", Intent::RequestService);
    h.backstop.add_error("do something unclassifiable");

    let result = h.coordinator.handle_turn("do something unclassifiable");

    assert!(!result.ok);
    assert_eq!(result.error.unwrap().kind, "classification_failure");
    assert!(h.coordinator.record().provenance.is_empty());
}

#[test]
fn test_context_rooted_envelope_paths_are_dropped() {
    let mut h = harness();
    h.extractor.add_envelope(
        "quiet backyard",
        UpdateEnvelope::new()
            .with(
                "area_description.site_use",
                FieldValue::list(vec![Value::String("residential backyard".to_string())]),
            )
            .with("customer_info.phone", FieldValue::text("555-0000"))
            .with("location.latitude", FieldValue::text("45.5")),
    );

    let result = h.coordinator.handle_turn("area description: quiet backyard");

    assert!(result.ok);
    assert_eq!(result.applied_paths, vec!["area_description.site_use"]);
    // context stays exactly as supplied at job start
    assert_eq!(h.coordinator.context().customer.phone, JobContext::sample().customer.phone);
}

#[test]
fn test_every_turn_writes_one_parseable_log_line() {
    let mut h = harness();
    h.extractor.add_envelope(
        "dbh 26 in",
        UpdateEnvelope::new().with("tree_description.dbh_in", FieldValue::text("26")),
    );
    h.extractor.add_error("garbled");
    h.intent
        .add_intent("summarize the risks", Intent::RequestService);

    h.coordinator.handle_turn("tree description: dbh 26 in");
    h.coordinator.handle_turn("risks: garbled");
    h.coordinator.handle_turn("summarize the risks");
    h.coordinator.handle_turn("change the customer phone to 555-1234");

    let lines = log_lines(&h);
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0]["ok"], true);
    assert_eq!(lines[0]["utterance"], "tree description: dbh 26 in");
    assert_eq!(lines[1]["ok"], false);
    assert_eq!(lines[1]["error"]["kind"], "extraction_failure");
    assert_eq!(lines[2]["route"], "request_service");
    assert_eq!(lines[2]["routing"]["service"], "SECTION_SUMMARY");
    assert_eq!(lines[3]["route"], "blocked_context_edit");
    for line in &lines {
        assert!(line["timestamp"].is_u64());
        assert!(line["turn_id"].as_str().unwrap().starts_with("turn-"));
    }
}

#[test]
fn test_correction_without_section_asks_for_clarification() {
    let mut h = harness();
    // an edit verb with an assignment shape but no section hint
    h.intent
        .add_intent("set it to blue", Intent::RequestService);

    let result = h.coordinator.handle_turn("set it to blue");

    assert!(result.ok);
    assert_eq!(result.route, TurnRoute::Clarify);
    assert!(result.note.as_deref().unwrap_or("").contains("section"));
    assert_eq!(h.corrections.call_count(), 0);
}
