//! tagguard Worker
//!
//! Composition root for the tagging pipeline: configuration, the model
//! seam, per-item processing and concurrent batches.
//!
//! ```text
//! ContentItem -> CircuitBreaker(retry(model)) -> Taxonomy::validate_results
//!             -> [aggregate_frame_tags] -> route -> TaggingOutcome
//! ```

pub mod batch;
pub mod config;
pub mod item;
pub mod model;
pub mod pipeline;

pub use batch::{BatchProcessor, BatchReport, ItemFailure};
pub use config::{ConfigOverrides, DependencyConfig, WorkerConfig};
pub use item::{Content, ContentItem, RecordedItem};
pub use model::{ModelRequest, RecordedModel, TaggingModel};
pub use pipeline::{TaggingOutcome, TaggingPipeline};
