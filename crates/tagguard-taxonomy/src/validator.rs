//! Hallucination filtering against the taxonomy
//!
//! `validate` is an exact, case-sensitive membership check. It never
//! resolves synonyms and never fails; unknown tags land in the invalid list.
//! Emitting the "HALLUCINATION DETECTED" signal is the caller's job since
//! only the caller knows the content id and the model.

use crate::taxonomy::Taxonomy;
use serde::{Deserialize, Serialize};
use tagguard_core::TagResult;

/// Candidate tags split by taxonomy membership, input order preserved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
}

impl ValidationOutcome {
    pub fn has_hallucinations(&self) -> bool {
        !self.invalid.is_empty()
    }

    pub fn total(&self) -> usize {
        self.valid.len() + self.invalid.len()
    }
}

/// Model results split by taxonomy membership and confidence sanity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultPartition {
    pub valid: Vec<TagResult>,
    pub invalid: Vec<TagResult>,
}

impl ResultPartition {
    pub fn has_hallucinations(&self) -> bool {
        !self.invalid.is_empty()
    }

    /// Tag names of the rejected results
    pub fn invalid_tags(&self) -> Vec<String> {
        self.invalid.iter().map(|r| r.tag.clone()).collect()
    }
}

impl Taxonomy {
    /// Stable partition of `candidates` into taxonomy members and the rest
    pub fn validate<S: AsRef<str>>(&self, candidates: &[S]) -> ValidationOutcome {
        let (valid, invalid): (Vec<String>, Vec<String>) = candidates
            .iter()
            .map(|tag| tag.as_ref().to_string())
            .partition(|tag| self.contains(tag));

        ValidationOutcome { valid, invalid }
    }

    /// Stable partition of model results.
    ///
    /// A result is valid when its tag is an exact taxonomy member and its
    /// confidence is a finite value in `[0, 1]`.
    pub fn validate_results(&self, results: Vec<TagResult>) -> ResultPartition {
        let (valid, invalid) = results
            .into_iter()
            .partition(|result| self.contains(&result.tag) && result.is_well_formed());

        ResultPartition { valid, invalid }
    }
}
