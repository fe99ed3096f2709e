//! Guard lexicon configuration

/// Lexicon the guard matches against
///
/// Phrases are matched on whitespace-normalized, lowercased, possessive-
/// stripped text. A turn is blocked only when a context field phrase appears
/// together with an edit verb, or is immediately followed by an assignment
/// separator (`:`, `is`, `=`).
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Field-specific phrases naming read-only context data
    pub field_phrases: Vec<String>,
    /// Verbs that signal a set/change attempt
    pub edit_verbs: Vec<String>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        let field_phrases = [
            // party A: the assessing arborist
            "arborist name",
            "arborist phone",
            "arborist email",
            "arborist address",
            "arborist info",
            "arborist license",
            "arborist certification",
            // party B: the customer
            "customer name",
            "customer phone",
            "customer email",
            "customer address",
            "customer info",
            // job identity & location
            "job id",
            "job number",
            "job location",
            "site address",
            "property address",
            "latitude",
            "longitude",
            "gps coordinates",
            "coordinates",
        ];
        let edit_verbs = [
            "change", "set", "update", "edit", "fix", "correct", "replace", "amend", "modify",
            "switch", "make",
        ];
        GuardConfig {
            field_phrases: field_phrases.iter().map(|s| s.to_string()).collect(),
            edit_verbs: edit_verbs.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl GuardConfig {
    /// A permissive lexicon that only guards geocoordinates (for setups where
    /// party identity is managed elsewhere)
    pub fn coordinates_only() -> Self {
        GuardConfig {
            field_phrases: ["latitude", "longitude", "gps coordinates", "coordinates"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            edit_verbs: GuardConfig::default().edit_verbs,
        }
    }
}
