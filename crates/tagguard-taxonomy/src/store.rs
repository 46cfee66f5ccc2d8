//! Lazily loaded taxonomy cache
//!
//! Owned by the composition root and shared by `Arc`. The taxonomy is read
//! once on first use and handed out as an immutable `Arc<Taxonomy>`;
//! `reload` and `clear` exist for operators and tests.

use crate::taxonomy::Taxonomy;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tagguard_core::Result;
use tracing::{debug, info};

/// Cached taxonomy backed by a file
pub struct TaxonomyStore {
    path: PathBuf,
    cached: RwLock<Option<Arc<Taxonomy>>>,
}

impl TaxonomyStore {
    /// Create a store; nothing is read until [`Self::get`]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: RwLock::new(None),
        }
    }

    /// Create a store that is already loaded, failing if the file is invalid
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(path);
        store.get()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the cached taxonomy, loading it on first access
    pub fn get(&self) -> Result<Arc<Taxonomy>> {
        if let Some(taxonomy) = self.cached.read().as_ref() {
            return Ok(Arc::clone(taxonomy));
        }

        let mut cached = self.cached.write();
        // Another caller may have loaded it while we waited for the lock.
        if let Some(taxonomy) = cached.as_ref() {
            return Ok(Arc::clone(taxonomy));
        }

        let taxonomy = Arc::new(Taxonomy::from_file(&self.path)?);
        *cached = Some(Arc::clone(&taxonomy));
        Ok(taxonomy)
    }

    /// Re-read the file. On failure the previous taxonomy stays cached.
    pub fn reload(&self) -> Result<Arc<Taxonomy>> {
        let taxonomy = Arc::new(Taxonomy::from_file(&self.path)?);
        let previous = self.cached.write().replace(Arc::clone(&taxonomy));

        info!(
            path = %self.path.display(),
            previous_version = previous.as_ref().map(|t| t.version()).unwrap_or("none"),
            version = %taxonomy.version(),
            "Reloaded taxonomy"
        );
        Ok(taxonomy)
    }

    /// Drop the cached taxonomy; the next `get` reads the file again
    pub fn clear(&self) {
        if self.cached.write().take().is_some() {
            debug!(path = %self.path.display(), "Cleared cached taxonomy");
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.cached.read().is_some()
    }
}
