//! Named circuit breaker registry
//!
//! One registry is built at process startup and shared by reference (usually
//! inside an `Arc`) with everything that calls an upstream dependency, so
//! every call for the same dependency name lands on the same breaker.

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tagguard_core::{Error, Result};
use tracing::{debug, warn};

/// Registry of circuit breakers keyed by dependency name
#[derive(Default)]
pub struct CircuitBreakerRegistry {
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl CircuitBreakerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the breaker for `name`, creating it with `config` if absent.
    ///
    /// First writer wins: once a breaker exists its configuration is fixed,
    /// and a later call with a different `config` gets the existing breaker
    /// (a warning is logged). Use [`Self::create`] to make that case an error.
    /// An invalid `config` is rejected even when the breaker already exists.
    pub fn get_or_create(
        &self,
        name: &str,
        config: CircuitBreakerConfig,
    ) -> Result<Arc<CircuitBreaker>> {
        config.validate()?;

        if let Some(existing) = self.breakers.read().get(name) {
            Self::warn_on_mismatch(existing, &config);
            return Ok(Arc::clone(existing));
        }

        let mut breakers = self.breakers.write();
        // Re-checked under the write lock so concurrent first access yields one instance.
        if let Some(existing) = breakers.get(name) {
            Self::warn_on_mismatch(existing, &config);
            return Ok(Arc::clone(existing));
        }

        debug!(dependency = %name, ?config, "Creating circuit breaker");
        let breaker = Arc::new(CircuitBreaker::new(name, config)?);
        breakers.insert(name.to_string(), Arc::clone(&breaker));
        Ok(breaker)
    }

    /// Create a breaker, failing if one already exists under `name`
    pub fn create(&self, name: &str, config: CircuitBreakerConfig) -> Result<Arc<CircuitBreaker>> {
        let mut breakers = self.breakers.write();
        if breakers.contains_key(name) {
            return Err(Error::validation(format!(
                "circuit breaker '{}' already exists",
                name
            )));
        }

        let breaker = Arc::new(CircuitBreaker::new(name, config)?);
        breakers.insert(name.to_string(), Arc::clone(&breaker));
        Ok(breaker)
    }

    /// Look up an existing breaker
    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.read().get(name).cloned()
    }

    /// Registered dependency names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Stats for every breaker, sorted by name
    pub fn stats(&self) -> Vec<CircuitBreakerStats> {
        let mut stats: Vec<CircuitBreakerStats> =
            self.breakers.read().values().map(|b| b.stats()).collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }

    pub fn len(&self) -> usize {
        self.breakers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.read().is_empty()
    }

    fn warn_on_mismatch(existing: &CircuitBreaker, requested: &CircuitBreakerConfig) {
        if existing.config() != requested {
            warn!(
                dependency = %existing.name(),
                existing = ?existing.config(),
                requested = ?requested,
                "Circuit breaker already exists, ignoring new configuration"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CircuitState;

    fn cfg(failures: u32) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: failures,
            ..CircuitBreakerConfig::default()
        }
    }

    #[test]
    fn test_same_name_shares_instance() {
        let registry = CircuitBreakerRegistry::new();
        let a = registry.get_or_create("text-model", cfg(5)).unwrap();
        let b = registry.get_or_create("text-model", cfg(5)).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_first_writer_wins() {
        let registry = CircuitBreakerRegistry::new();
        registry.get_or_create("video-model", cfg(3)).unwrap();
        let second = registry.get_or_create("video-model", cfg(10)).unwrap();

        assert_eq!(second.config().failure_threshold, 3);
    }

    #[test]
    fn test_create_rejects_existing() {
        let registry = CircuitBreakerRegistry::new();
        registry.create("text-model", cfg(5)).unwrap();

        let err = registry.create("text-model", cfg(5)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_create_validates_config() {
        let registry = CircuitBreakerRegistry::new();
        assert!(registry.create("text-model", cfg(0)).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_get_or_create_validates_config() {
        let registry = CircuitBreakerRegistry::new();
        let err = registry.get_or_create("text-model", cfg(0)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(registry.is_empty());

        registry.get_or_create("text-model", cfg(5)).unwrap();
        assert!(registry.get_or_create("text-model", cfg(0)).is_err());
    }

    #[test]
    fn test_names_and_stats_sorted() {
        let registry = CircuitBreakerRegistry::new();
        registry.get_or_create("video-model", cfg(5)).unwrap();
        registry.get_or_create("text-model", cfg(5)).unwrap();

        assert_eq!(registry.names(), vec!["text-model", "video-model"]);

        let stats = registry.stats();
        assert_eq!(stats[0].name, "text-model");
        assert_eq!(stats[1].state, CircuitState::Closed);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_concurrent_first_access_single_instance() {
        let registry = Arc::new(CircuitBreakerRegistry::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.get_or_create("text-model", cfg(5)).unwrap())
            })
            .collect();

        let breakers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for breaker in &breakers[1..] {
            assert!(Arc::ptr_eq(&breakers[0], breaker));
        }
        assert_eq!(registry.len(), 1);
    }
}
