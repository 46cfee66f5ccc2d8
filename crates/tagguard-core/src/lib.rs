//! tagguard Core
//!
//! Core types and the error taxonomy shared across tagguard components.
//!
//! This crate provides:
//! - The typed error taxonomy (validation, processing, circuit-open, video
//!   input and taxonomy errors) with an explicit [`ErrorKind`] per error
//! - Tag results produced by model invocations
//! - Frame samples used by video tagging
//! - Routing decisions produced by the confidence router

pub mod error;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use types::{DecisionSource, FrameSample, RoutingDecision, TagResult};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::types::{DecisionSource, FrameSample, RoutingDecision, TagResult};
}
