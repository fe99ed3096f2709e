//! Provenance tracking
//!
//! One row per applied field per merge, plus a single synthetic "Not Found"
//! row when a merge applied nothing. Rows accumulate on the record; under
//! the `last_write` policy a new row for a scalar path supersedes any
//! earlier row for the same section+path.

use crate::envelope::NOT_FOUND;
use crate::section::Section;
use serde::{Deserialize, Serialize};

/// A single audit entry recording what changed and from what source text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRow {
    /// Correlation id of the turn that produced this row
    pub turn_id: String,

    /// Section the source segment was scoped to
    pub section: Section,

    /// Dotted field path that changed, or "Not Found"
    pub path: String,

    /// Applied value rendered as a string, or "Not Found"
    pub value: String,

    /// The exact segment text that was sent to the extractor
    pub segment_text: String,

    /// Identity of the extractor that produced the envelope
    pub extractor: String,

    /// Unix seconds when the row was recorded
    pub timestamp: u64,
}

impl ProvenanceRow {
    /// True for the synthetic row emitted when a merge applied nothing
    pub fn is_not_found(&self) -> bool {
        self.path == NOT_FOUND
    }
}
