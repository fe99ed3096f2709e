//! Canonical report sections
//!
//! Sections are a closed enum rather than free-form strings so that an
//! unknown section fails fast with a typed error instead of a silent miss.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The five addressable sections of a report record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// Site context around the tree
    AreaDescription,
    /// The tree itself (species, dimensions, defects)
    TreeDescription,
    /// Things that could be struck (structures, people, vehicles)
    Targets,
    /// Assessed risks
    Risks,
    /// Recommended work
    Recommendations,
}

impl Section {
    /// All sections, in canonical report order
    pub const ALL: [Section; 5] = [
        Section::AreaDescription,
        Section::TreeDescription,
        Section::Targets,
        Section::Risks,
        Section::Recommendations,
    ];

    /// Canonical snake_case identifier (matches record field names and
    /// envelope path roots)
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::AreaDescription => "area_description",
            Section::TreeDescription => "tree_description",
            Section::Targets => "targets",
            Section::Risks => "risks",
            Section::Recommendations => "recommendations",
        }
    }

    /// Parse a canonical identifier or a spoken label ("tree description")
    ///
    /// Returns `None` for anything outside the closed section set.
    pub fn parse(s: &str) -> Option<Section> {
        let norm: String = s
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_");
        match norm.as_str() {
            "area_description" | "areadescription" | "area" => Some(Section::AreaDescription),
            "tree_description" | "treedescription" | "tree" => Some(Section::TreeDescription),
            "targets" | "target" => Some(Section::Targets),
            "risks" | "risk" => Some(Section::Risks),
            "recommendations" | "recommendation" => Some(Section::Recommendations),
            _ => None,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical() {
        assert_eq!(Section::parse("risks"), Some(Section::Risks));
        assert_eq!(Section::parse("tree_description"), Some(Section::TreeDescription));
    }

    #[test]
    fn test_parse_spoken_label() {
        assert_eq!(Section::parse("Tree Description"), Some(Section::TreeDescription));
        assert_eq!(Section::parse("  AREA description "), Some(Section::AreaDescription));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(Section::parse("weather"), None);
        assert_eq!(Section::parse(""), None);
    }

    #[test]
    fn test_roundtrip_all() {
        for sec in Section::ALL {
            assert_eq!(Section::parse(sec.as_str()), Some(sec));
        }
    }
}
