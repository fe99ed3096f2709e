//! Arbora Context Guard
//!
//! Detects attempts to mutate read-only job-context fields (party identity,
//! location, geocoordinates) before anything else runs. The guard is
//! deliberately narrow: it blocks only direct set/change attempts against a
//! context field, never incidental mentions of similar-sounding site details
//! ("customer parking lot" as a target must pass).

#![warn(missing_docs)]

pub mod config;
pub mod guard;

pub use config::GuardConfig;
pub use guard::{ContextGuard, GuardDecision};
