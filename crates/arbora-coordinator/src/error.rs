//! Turn-level error taxonomy
//!
//! Every failure is caught at the coordinator boundary and embedded in the
//! turn result; nothing propagates past the turn.

use crate::registry::RegistryError;
use arbora_domain::{MergeError, Section};
use arbora_router::RouterError;
use thiserror::Error;

/// A turn failed; the record holds whatever merged before the failure
#[derive(Debug, Error)]
pub enum TurnError {
    /// Intent classifier unavailable or raised
    #[error("intent classification failed: {0}")]
    Classification(String),

    /// Extractor raised or returned a malformed envelope
    #[error("extraction failed for {section}: {message}")]
    Extraction {
        /// Section being extracted
        section: Section,
        /// What the extractor reported
        message: String,
    },

    /// The merge engine rejected the envelope
    #[error(transparent)]
    Merge(#[from] MergeError),

    /// Routing failed (backstop unavailable)
    #[error(transparent)]
    Routing(#[from] RouterError),

    /// Extraction dispatch had no extractor for the section
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl TurnError {
    /// Stable short kind for the turn result and log
    pub fn kind(&self) -> &'static str {
        match self {
            TurnError::Classification(_) | TurnError::Routing(_) => "classification_failure",
            TurnError::Extraction { .. } | TurnError::Merge(_) | TurnError::Registry(_) => {
                "extraction_failure"
            }
        }
    }
}
