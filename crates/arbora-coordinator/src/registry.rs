//! Extraction dispatch registry
//!
//! An immutable section-to-extractor mapping built once at startup and
//! handed to the coordinator. Lookups are keyed by the section enum, so an
//! unregistered section is a typed error, not a silent miss.

use arbora_domain::{Section, SectionExtractor};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Registry construction or lookup failure
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A section has no registered extractor
    #[error("no extractor registered for section: {0}")]
    MissingSection(Section),
}

/// Immutable section-to-extractor mapping
pub struct ExtractorRegistry {
    slots: BTreeMap<Section, Arc<dyn SectionExtractor>>,
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("sections", &self.slots.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ExtractorRegistry {
    /// Build a registry from an explicit mapping; every section must be
    /// covered
    pub fn from_map(
        slots: BTreeMap<Section, Arc<dyn SectionExtractor>>,
    ) -> Result<ExtractorRegistry, RegistryError> {
        for section in Section::ALL {
            if !slots.contains_key(&section) {
                return Err(RegistryError::MissingSection(section));
            }
        }
        Ok(ExtractorRegistry { slots })
    }

    /// Register the same extractor for every section
    pub fn uniform(extractor: Arc<dyn SectionExtractor>) -> ExtractorRegistry {
        let mut slots: BTreeMap<Section, Arc<dyn SectionExtractor>> = BTreeMap::new();
        for section in Section::ALL {
            slots.insert(section, Arc::clone(&extractor));
        }
        ExtractorRegistry { slots }
    }

    /// Resolve the extractor for a section
    pub fn get(&self, section: Section) -> Result<&dyn SectionExtractor, RegistryError> {
        self.slots
            .get(&section)
            .map(|e| e.as_ref())
            .ok_or(RegistryError::MissingSection(section))
    }
}
