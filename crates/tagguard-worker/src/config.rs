//! Worker configuration
//!
//! Sources, lowest precedence first: built-in defaults, optional YAML file,
//! `TAGGUARD__*` environment variables (`__` separates nested keys), then
//! command line overrides.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tagguard_core::{Error, Result};
use tagguard_resilience::{CircuitBreakerConfig, RetryConfig};
use tagguard_routing::RoutingConfig;
use tagguard_video::FrameSamplingConfig;
use tracing::debug;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "TAGGUARD";

/// Worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Taxonomy document (JSON or YAML)
    #[serde(default = "default_taxonomy_path")]
    pub taxonomy_path: PathBuf,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub sampling: FrameSamplingConfig,

    #[serde(default = "default_text_model")]
    pub text_model: DependencyConfig,

    #[serde(default = "default_video_model")]
    pub video_model: DependencyConfig,

    /// Items processed concurrently in a batch
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

/// Resilience settings for one upstream model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyConfig {
    /// Breaker registry key
    pub name: String,

    #[serde(default)]
    pub breaker: CircuitBreakerConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl DependencyConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            breaker: CircuitBreakerConfig::default(),
            retry: RetryConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("dependency name must not be empty"));
        }
        self.breaker
            .validate()
            .and_then(|_| self.retry.validate())
            .map_err(|e| Error::config(format!("{}: {}", self.name, e)))
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub taxonomy_path: Option<PathBuf>,
    pub confidence_threshold: Option<f64>,
    pub concurrency: Option<usize>,
}

impl WorkerConfig {
    /// Load from an optional file, the process environment and overrides
    pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let env = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true);
        Self::load_with_env(path, env, overrides)
    }

    /// [`Self::load`] with an explicit environment source
    pub fn load_with_env(
        path: Option<&Path>,
        env: Environment,
        overrides: &ConfigOverrides,
    ) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("text_model.name", default_text_model().name)
            .and_then(|b| b.set_default("video_model.name", default_video_model().name))
            .map_err(|e| Error::config(e.to_string()))?;

        if let Some(path) = path {
            debug!(path = %path.display(), "Reading configuration file");
            builder = builder.add_source(File::from(path).required(false));
        }

        let mut config: WorkerConfig = builder
            .add_source(env)
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::config(e.to_string()))?;

        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(path) = &overrides.taxonomy_path {
            self.taxonomy_path = path.clone();
        }
        if let Some(threshold) = overrides.confidence_threshold {
            self.routing.confidence_threshold = threshold;
        }
        if let Some(concurrency) = overrides.concurrency {
            self.concurrency = concurrency;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let as_config = |e: Error| Error::config(e.to_string());

        self.routing.validate().map_err(as_config)?;
        self.sampling.validate().map_err(as_config)?;
        self.text_model.validate()?;
        self.video_model.validate()?;

        if self.text_model.name == self.video_model.name {
            return Err(Error::config(
                "text_model and video_model must use distinct dependency names",
            ));
        }
        if self.concurrency == 0 {
            return Err(Error::config("concurrency must be at least 1"));
        }
        Ok(())
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            taxonomy_path: default_taxonomy_path(),
            routing: RoutingConfig::default(),
            sampling: FrameSamplingConfig::default(),
            text_model: default_text_model(),
            video_model: default_video_model(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_taxonomy_path() -> PathBuf {
    PathBuf::from("taxonomy/taxonomy.json")
}

fn default_text_model() -> DependencyConfig {
    DependencyConfig::new("text-model")
}

fn default_video_model() -> DependencyConfig {
    DependencyConfig::new("video-model")
}

fn default_concurrency() -> usize {
    8
}
