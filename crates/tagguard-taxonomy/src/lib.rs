//! tagguard Taxonomy
//!
//! The closed vocabulary every model-produced tag is checked against.
//!
//! - [`Taxonomy`]: versioned tag set with vertical/category groupings and
//!   synonym mappings, structurally validated on load
//! - [`Taxonomy::validate`]: stable partition of candidate tags into valid
//!   and invalid (hallucinated) lists
//! - [`Taxonomy::canonicalize`]: resolve a tag or synonym to its canonical tag
//! - [`TaxonomyStore`]: lazily loaded, cached taxonomy with explicit reload
//!
//! A taxonomy that fails to load is fatal; there is no fallback vocabulary.

pub mod store;
pub mod taxonomy;
pub mod validator;

pub use store::TaxonomyStore;
pub use taxonomy::{normalize_tag, Taxonomy, TaxonomySource};
pub use validator::{ResultPartition, ValidationOutcome};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::store::TaxonomyStore;
    pub use crate::taxonomy::{normalize_tag, Taxonomy};
    pub use crate::validator::{ResultPartition, ValidationOutcome};
}
