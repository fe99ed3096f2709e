//! Deterministic (no-LLM) service classifier
//!
//! Classifies a service request and optionally its section using lexicons,
//! cue phrases, and field-to-section hints. Routing order honors explicit
//! outline intent early:
//!
//! 1. MAKE_CORRECTION (edit verb + section hint, or an assignment phrase)
//! 2. OUTLINE (the explicit word "outline" only)
//! 3. SECTION_SUMMARY (prose cues; requires a detectable section)
//! 4. QUICK_SUMMARY (sectionless brief-summary cues)
//! 5. MAKE_REPORT_DRAFT
//! 6. NONE (hand to the backstop)

use arbora_domain::{Section, ServiceKind};

const CORRECTION_VERBS: [&str; 16] = [
    "update", "fix", "adjust", "replace", "amend", "edit", "modify", "revise", "set", "switch",
    "change", "correct", "alter", "add", "insert", "remove",
];

const SECTION_TOKENS: [(&str, Section); 10] = [
    ("tree description", Section::TreeDescription),
    ("tree_description", Section::TreeDescription),
    ("area description", Section::AreaDescription),
    ("area_description", Section::AreaDescription),
    ("targets", Section::Targets),
    ("target", Section::Targets),
    ("risks", Section::Risks),
    ("risk", Section::Risks),
    ("recommendations", Section::Recommendations),
    ("recommendation", Section::Recommendations),
];

/// Field-to-section hints for utterances without explicit section tokens
/// ("crown shape" language implies the tree description)
const FIELD_HINTS: [(&str, Section); 28] = [
    ("species", Section::TreeDescription),
    ("scientific name", Section::TreeDescription),
    ("height", Section::TreeDescription),
    ("dbh", Section::TreeDescription),
    ("diameter", Section::TreeDescription),
    ("crown shape", Section::TreeDescription),
    ("canopy", Section::TreeDescription),
    ("deadwood", Section::TreeDescription),
    ("site", Section::AreaDescription),
    ("foot traffic", Section::AreaDescription),
    ("likelihood", Section::Risks),
    ("severity", Section::Risks),
    ("rationale", Section::Risks),
    ("included bark", Section::Risks),
    ("occupied frequency", Section::Targets),
    ("proximity", Section::Targets),
    ("strike potential", Section::Targets),
    ("walkway", Section::Targets),
    ("parking lot", Section::Targets),
    ("playground", Section::Targets),
    ("driveway", Section::Targets),
    ("roof", Section::Targets),
    ("building", Section::Targets),
    ("pruning", Section::Recommendations),
    ("removal", Section::Recommendations),
    ("work scope", Section::Recommendations),
    ("limitations", Section::Recommendations),
    ("treatment plan", Section::Recommendations),
];

/// Prose-summary cues. Outline variants are handled separately.
const SECTION_SUMMARY_CUES: [&str; 11] = [
    "section summary",
    "summary of",
    "summarize the",
    "summarise the",
    "recap",
    "overview of",
    "synopsis of",
    "describe the",
    "breakdown of",
    "brief summary of",
    "condensed summary of",
];

/// Whole-record quick summary cues (sectionless by construction)
const QUICK_SUMMARY_CUES: [&str; 5] = [
    "quick summary",
    "short summary",
    "tldr",
    "tl;dr",
    "where are we",
];

const REPORT_DRAFT_CUES: [&str; 10] = [
    "draft a report",
    "report draft",
    "generate a report",
    "generate the report",
    "build a report",
    "produce a report",
    "prepare my report",
    "make the report",
    "write a report",
    "compile a report",
];

const DRAFT_VERBS: [&str; 9] = [
    "draft", "generate", "produce", "prepare", "build", "create", "compile", "write", "start",
];

fn normalize(s: &str) -> String {
    s.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Infer the canonical section from tokens or field hints
pub fn detect_section(text: &str) -> Option<Section> {
    let t = normalize(text);
    for (token, section) in SECTION_TOKENS {
        if t.contains(token) {
            return Some(section);
        }
    }
    for (hint, section) in FIELD_HINTS {
        if t.contains(hint) {
            return Some(section);
        }
    }
    None
}

fn looks_like_correction(t: &str) -> bool {
    if !CORRECTION_VERBS.iter().any(|v| contains_word(t, v)) {
        return false;
    }
    // require a domain hint, or an assignment-like phrase, to avoid overfiring
    if detect_section(t).is_some() {
        return true;
    }
    [" to ", " = ", " should be ", " set to ", " with "]
        .iter()
        .any(|a| t.contains(a))
}

fn contains_word(t: &str, word: &str) -> bool {
    let padded = format!(" {} ", t);
    padded.contains(&format!(" {} ", word))
}

fn looks_like_section_summary(t: &str) -> Option<Section> {
    if contains_any(t, &SECTION_SUMMARY_CUES) {
        return detect_section(t);
    }
    // "tl;dr for the targets section" style
    if (t.contains("tldr") || t.contains("tl;dr")) && t.contains("section") {
        return detect_section(t);
    }
    None
}

fn looks_like_report_draft(t: &str) -> bool {
    if contains_any(t, &REPORT_DRAFT_CUES) {
        return true;
    }
    t.contains("report") && DRAFT_VERBS.iter().any(|v| contains_word(t, v))
}

/// Classify a service request: `(service, section)`
///
/// Returns `(ServiceKind::None, None)` when no lexicon matches; the caller
/// hands those to the backstop.
pub fn classify_service(text: &str) -> (ServiceKind, Option<Section>) {
    let t = normalize(text);

    // 1) correction
    if looks_like_correction(&t) {
        return (ServiceKind::MakeCorrection, detect_section(&t));
    }

    // 2) explicit outline (only on the word itself)
    if contains_word(&t, "outline") {
        return (ServiceKind::Outline, detect_section(&t));
    }

    // 3) section summary (prose) requires a detectable section
    if let Some(section) = looks_like_section_summary(&t) {
        return (ServiceKind::SectionSummary, Some(section));
    }

    // 4) sectionless quick summary
    if contains_any(&t, &QUICK_SUMMARY_CUES) && detect_section(&t).is_none() {
        return (ServiceKind::QuickSummary, None);
    }

    // 5) report draft
    if looks_like_report_draft(&t) {
        return (ServiceKind::MakeReportDraft, None);
    }

    // 6) ambiguous
    (ServiceKind::None, None)
}
