//! Prompt construction for the Ollama adapters
//!
//! Prompts pin the output contract: strict JSON, the canonical field paths
//! for the target section, and the sentinel for anything not mentioned.

use arbora_domain::Section;

/// Allowed dotted field paths for one section, quoted into the prompt so the
/// model cannot invent paths the record schema would reject.
pub fn section_paths(section: Section) -> &'static [&'static str] {
    match section {
        Section::AreaDescription => &[
            "area_description.foot_traffic_level",
            "area_description.context",
            "area_description.site_use",
            "area_description.narratives",
        ],
        Section::TreeDescription => &[
            "tree_description.type_common",
            "tree_description.type_scientific",
            "tree_description.height_ft",
            "tree_description.canopy_width_ft",
            "tree_description.crown_shape",
            "tree_description.dbh_in",
            "tree_description.defects",
            "tree_description.general_observations",
            "tree_description.narratives",
        ],
        Section::Targets => &["targets.items", "targets.narratives"],
        Section::Risks => &["risks.items", "risks.narratives"],
        Section::Recommendations => &[
            "recommendations.pruning.narrative",
            "recommendations.pruning.scope",
            "recommendations.pruning.limitations",
            "recommendations.pruning.notes",
            "recommendations.removal.narrative",
            "recommendations.removal.scope",
            "recommendations.removal.limitations",
            "recommendations.removal.notes",
            "recommendations.continued_maintenance.narrative",
            "recommendations.continued_maintenance.scope",
            "recommendations.continued_maintenance.limitations",
            "recommendations.continued_maintenance.notes",
            "recommendations.narratives",
        ],
    }
}

/// Build the intent-classification prompt
pub fn intent_prompt(utterance: &str) -> String {
    format!(
        "You classify one utterance from a field arborist dictating a site assessment.\n\
         Decide whether the operator is PROVIDING factual content for the report, or \
         REQUESTING an action such as a summary, an outline, a draft, or a correction.\n\
         Respond with strict JSON only: {{\"intent\": \"PROVIDE_STATEMENT\"}} or \
         {{\"intent\": \"REQUEST_SERVICE\"}}.\n\n\
         Utterance: {}",
        utterance
    )
}

/// Build the field-extraction prompt for one section
///
/// `correction` switches the framing from capturing new facts to replacing
/// previously captured values.
pub fn extraction_prompt(section: Section, payload: &str, correction: bool) -> String {
    let paths = section_paths(section).join("\n  ");
    let framing = if correction {
        "The operator is CORRECTING previously recorded values. Extract the replacement \
         values they state."
    } else {
        "The operator is dictating field observations. Extract only values they actually \
         state."
    };
    format!(
        "You extract structured fields for the \"{}\" section of an arborist report.\n\
         {}\n\
         Respond with strict JSON only, in the shape {{\"updates\": {{\"<path>\": <value>}}}}.\n\
         Allowed paths:\n  {}\n\
         Scalar fields take a string value. Fields named items, defects, context, site_use, \
         general_observations, damage_modes, and narratives take a JSON array of new elements \
         to append. Omit any path the text does not mention. Never guess.\n\n\
         Text: {}",
        section, framing, paths, payload
    )
}

/// Build the backstop service-classification prompt
pub fn backstop_prompt(utterance: &str) -> String {
    format!(
        "You classify an ambiguous action request from a field arborist working on a report \
         with sections: area_description, tree_description, targets, risks, recommendations.\n\
         Services: MAKE_CORRECTION, SECTION_SUMMARY, QUICK_SUMMARY, OUTLINE, \
         MAKE_REPORT_DRAFT, NONE.\n\
         Respond with strict JSON only: {{\"service\": \"<label>\", \"section\": \
         \"<section or null>\", \"confidence\": <0.0-1.0>}}. Use NONE with low confidence \
         when you cannot tell.\n\n\
         Request: {}",
        utterance
    )
}
