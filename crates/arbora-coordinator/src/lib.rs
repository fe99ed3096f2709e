//! Arbora Turn Coordinator
//!
//! Turns free-form operator utterances into structured, audited updates to
//! a canonical field report, and routes action requests (summaries, drafts,
//! corrections) to the right handler. One coordinator instance owns one
//! record and its read-only job context; every turn produces exactly one
//! [`TurnResult`] and one turn log entry.

#![warn(missing_docs)]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod registry;
pub mod segment;
pub mod turn;
pub mod turn_log;

pub use config::{ConfigError, CoordinatorConfig};
pub use coordinator::Coordinator;
pub use error::TurnError;
pub use registry::{ExtractorRegistry, RegistryError};
pub use segment::{segment, Segment, Segmentation};
pub use turn::{ErrorDetail, SegmentNote, TurnResult, TurnRoute};
pub use turn_log::{TurnLog, TurnLogError};
