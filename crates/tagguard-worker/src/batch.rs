//! Concurrent batch processing with per-item failure reporting

use crate::item::ContentItem;
use crate::model::TaggingModel;
use crate::pipeline::{TaggingOutcome, TaggingPipeline};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tagguard_core::ErrorKind;
use tracing::info;

/// An item that could not be tagged
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    pub content_id: String,
    pub kind: ErrorKind,
    pub retryable: bool,
    pub circuit_open: bool,
    pub error: String,
}

/// Outcome of a batch, in input order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<TaggingOutcome>,
    pub failures: Vec<ItemFailure>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len() + self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Content ids to hand back to the queue for redelivery
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.content_id.as_str()).collect()
    }

    pub fn needs_review(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.decision.needs_review)
            .count()
    }
}

/// Runs items through a pipeline with bounded concurrency
pub struct BatchProcessor {
    pipeline: Arc<TaggingPipeline>,
    concurrency: usize,
}

impl BatchProcessor {
    pub fn new(pipeline: Arc<TaggingPipeline>, concurrency: usize) -> Self {
        Self {
            pipeline,
            concurrency: concurrency.max(1),
        }
    }

    pub fn pipeline(&self) -> &TaggingPipeline {
        &self.pipeline
    }

    /// Process every item. One item failing never stops the others.
    pub async fn process(&self, items: &[ContentItem], model: &dyn TaggingModel) -> BatchReport {
        let pipeline = self.pipeline.as_ref();

        let mut results: Vec<_> = stream::iter(items.iter().enumerate())
            .map(|(index, item)| async move { (index, item, pipeline.process(item, model).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        results.sort_by_key(|(index, _, _)| *index);

        let mut report = BatchReport::default();
        for (_, item, result) in results {
            match result {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(err) => report.failures.push(ItemFailure {
                    content_id: item.content_id.clone(),
                    kind: err.kind(),
                    retryable: err.is_retryable(),
                    circuit_open: err.is_circuit_open(),
                    error: err.to_string(),
                }),
            }
        }

        info!(
            items = report.total(),
            succeeded = report.outcomes.len(),
            failed = report.failures.len(),
            needs_review = report.needs_review(),
            "Batch complete"
        );

        report
    }
}
