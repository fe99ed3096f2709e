//! Arbora Service Router
//!
//! Two-tier routing for action requests: a deterministic lexicon classifier
//! tried first, then a confidence-gated learned backstop, then clarify. The
//! record is never touched by routing; the decision is returned to the
//! coordinator and logged.

#![warn(missing_docs)]

pub mod deterministic;
pub mod router;

pub use deterministic::{classify_service, detect_section};
pub use router::{RouteSource, RouterError, RoutingDecision, ServiceRouter, DEFAULT_BACKSTOP_MIN_CONFIDENCE};
