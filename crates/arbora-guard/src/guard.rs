//! Context-edit detection logic

use crate::config::GuardConfig;
use serde::Serialize;

/// Verdict for one utterance
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GuardDecision {
    /// No context-edit attempt detected
    Pass,
    /// The utterance tries to set/change a read-only context field
    Blocked {
        /// The matched field phrase
        phrase: String,
        /// Short explanation surfaced to the operator
        note: String,
    },
}

impl GuardDecision {
    /// True when the turn must be short-circuited
    pub fn is_blocked(&self) -> bool {
        matches!(self, GuardDecision::Blocked { .. })
    }
}

/// The guard itself; cheap to construct, no I/O
pub struct ContextGuard {
    config: GuardConfig,
}

impl ContextGuard {
    /// Create a guard with the given lexicon
    pub fn new(config: GuardConfig) -> ContextGuard {
        ContextGuard { config }
    }

    /// Create a guard with the default lexicon
    pub fn default_config() -> ContextGuard {
        ContextGuard::new(GuardConfig::default())
    }

    /// Check one raw utterance
    ///
    /// Blocks when a context field phrase co-occurs with an edit verb, or is
    /// directly followed by an assignment separator. A phrase mention alone
    /// never blocks.
    pub fn check(&self, utterance: &str) -> GuardDecision {
        let text = normalize(utterance);
        let padded = format!(" {} ", text);

        let phrase = match self
            .config
            .field_phrases
            .iter()
            .find(|p| contains_word(&padded, p))
        {
            Some(p) => p,
            None => return GuardDecision::Pass,
        };

        let has_edit_verb = self
            .config
            .edit_verbs
            .iter()
            .any(|v| contains_word(&padded, v));

        if has_edit_verb || followed_by_assignment(&text, phrase) {
            return GuardDecision::Blocked {
                phrase: phrase.clone(),
                note: format!(
                    "\"{}\" is part of the job context and is read-only; context is set when the job is accepted",
                    phrase
                ),
            };
        }
        GuardDecision::Pass
    }
}

/// Lowercase, strip possessives, collapse whitespace and punctuation noise
fn normalize(s: &str) -> String {
    let lower = s.to_lowercase().replace("'s ", " ").replace("\u{2019}s ", " ");
    let cleaned: String = lower
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ':' || c == '=' || c == '.' {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whole-word containment on pre-padded text
fn contains_word(padded: &str, needle: &str) -> bool {
    padded.contains(&format!(" {} ", needle))
        || padded.contains(&format!(" {}: ", needle))
        || padded.contains(&format!(" {}= ", needle))
}

/// Is the phrase immediately followed by `:`, `is`, or `=`?
fn followed_by_assignment(text: &str, phrase: &str) -> bool {
    let mut search = text;
    while let Some(idx) = search.find(phrase) {
        let rest = search[idx + phrase.len()..].trim_start();
        if rest.starts_with(':')
            || rest.starts_with('=')
            || rest.starts_with("is ")
            || rest == "is"
        {
            return true;
        }
        search = &search[idx + phrase.len()..];
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> ContextGuard {
        ContextGuard::default_config()
    }

    #[test]
    fn test_edit_verb_plus_field_blocks() {
        assert!(guard().check("change the customer phone to 555-1234").is_blocked());
        assert!(guard().check("please update the arborist license").is_blocked());
        assert!(guard().check("fix the latitude, it's off by a degree").is_blocked());
    }

    #[test]
    fn test_assignment_without_verb_blocks() {
        assert!(guard().check("customer name: John Smith").is_blocked());
        assert!(guard().check("the job id is 4471").is_blocked());
    }

    #[test]
    fn test_site_observation_mentioning_customer_passes() {
        // "customer parking lot" is a site detail, not a context edit
        assert_eq!(
            guard().check("targets: vehicles in the customer parking lot"),
            GuardDecision::Pass
        );
    }

    #[test]
    fn test_plain_statement_passes() {
        assert_eq!(guard().check("dbh is 26 inches, crown is vase shaped"), GuardDecision::Pass);
        assert_eq!(guard().check("summarize the risks"), GuardDecision::Pass);
    }

    #[test]
    fn test_mention_without_edit_attempt_passes() {
        // mentions a guarded noun but neither verb nor assignment
        assert_eq!(
            guard().check("the customer phone rang during the visit"),
            GuardDecision::Pass
        );
    }

    #[test]
    fn test_possessive_is_normalized() {
        assert!(guard().check("update the customer's email please").is_blocked());
    }

    #[test]
    fn test_blocked_note_names_the_field() {
        match guard().check("set the longitude to -122.5") {
            GuardDecision::Blocked { phrase, note } => {
                assert_eq!(phrase, "longitude");
                assert!(note.contains("read-only"));
            }
            GuardDecision::Pass => panic!("expected block"),
        }
    }
}
