//! Arbora Domain Layer
//!
//! This crate contains the core business logic and domain model for Arbora:
//! the canonical report record, the update-envelope contract every extraction
//! and classification service agrees on, and the merge engine that applies
//! envelopes to the record with provenance.
//!
//! ## Key Concepts
//!
//! - **Record**: the canonical, per-job structured report, mutated only
//!   through the merge engine
//! - **Sentinel**: the reserved "Not provided" marker distinguishing
//!   "unknown" from "explicitly empty"
//! - **Update Envelope**: a mapping of dotted field paths to value-or-sentinel
//! - **Provenance Row**: an immutable audit entry per applied field
//! - **Ports**: trait seams for intent classification, section extraction,
//!   and the routing backstop, so the coordinator can be tested with
//!   deterministic fakes

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod envelope;
pub mod provenance;
pub mod record;
pub mod section;
pub mod traits;

// Re-exports for convenience
pub use context::JobContext;
pub use envelope::{FieldValue, UpdateEnvelope, NOT_FOUND, NOT_PROVIDED};
pub use provenance::ProvenanceRow;
pub use record::{MergeError, MergeOrigin, MergeOutcome, MergePolicy, Record};
pub use section::Section;
pub use traits::{BackstopClassifier, BackstopPrediction, Intent, IntentClassifier, SectionExtractor, ServiceKind};
