//! tagguard Routing
//!
//! The single policy point that turns model confidence into an operational
//! consequence: publish automatically, or send to human review.
//!
//! [`route`] is a pure function of the validated tags and the threshold, so
//! every confidence configuration can be tested directly.

pub mod config;
pub mod router;

pub use config::RoutingConfig;
pub use router::{route, ConfidenceRouter, NO_VALID_TAGS_REASON};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::RoutingConfig;
    pub use crate::router::{route, ConfidenceRouter};
}
