//! Per-item tagging pipeline
//!
//! ```text
//! text:  breaker(retry(model)) -> validate -> route
//! video: format -> sample -> [breaker(retry(model)) per frame] -> validate
//!        -> aggregate -> route
//! ```
//!
//! Retry runs inside the breaker, so one `execute` records one outcome no
//! matter how many attempts the retry loop made.

use crate::config::{DependencyConfig, WorkerConfig};
use crate::item::{Content, ContentItem};
use crate::model::{ModelRequest, TaggingModel};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tagguard_core::{FrameSample, Result, RoutingDecision, TagResult};
use tagguard_resilience::{retry, CircuitBreakerRegistry, RetryContext};
use tagguard_routing::ConfidenceRouter;
use tagguard_taxonomy::Taxonomy;
use tagguard_telemetry::{events, MetricsCollector};
use tagguard_video::{validate_format, FrameSamplingConfig};
use tracing::{debug, warn};

/// Result of tagging one item
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaggingOutcome {
    pub content_id: String,

    /// Validated (and for video, aggregated) tags
    pub tags: Vec<TagResult>,

    /// Tags dropped because they are not in the taxonomy
    pub hallucinated: Vec<String>,

    pub decision: RoutingDecision,

    /// Frames tagged, for video items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames_sampled: Option<usize>,
}

/// Composes breakers, retries, taxonomy validation and routing
pub struct TaggingPipeline {
    registry: Arc<CircuitBreakerRegistry>,
    taxonomy: Arc<Taxonomy>,
    router: ConfidenceRouter,
    sampling: FrameSamplingConfig,
    text_model: DependencyConfig,
    video_model: DependencyConfig,
    metrics: MetricsCollector,
}

impl TaggingPipeline {
    pub fn new(
        config: &WorkerConfig,
        taxonomy: Arc<Taxonomy>,
        registry: Arc<CircuitBreakerRegistry>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            registry,
            taxonomy,
            router: ConfidenceRouter::new(config.routing.clone())?,
            sampling: config.sampling.clone(),
            text_model: config.text_model.clone(),
            video_model: config.video_model.clone(),
            metrics: MetricsCollector::new(),
        })
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn registry(&self) -> &CircuitBreakerRegistry {
        &self.registry
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Tag one item and route the result.
    ///
    /// Errors are returned unchanged so the message boundary can decide on
    /// redelivery; the item is counted as failed either way.
    pub async fn process(&self, item: &ContentItem, model: &dyn TaggingModel) -> Result<TaggingOutcome> {
        let start = Instant::now();

        let result = match &item.content {
            Content::Text { text } => self.process_text(item, text, model).await,
            Content::Video {
                video_url,
                duration_seconds,
            } => {
                self.process_video(item, video_url, *duration_seconds, model)
                    .await
            }
        };

        let latency_us = start.elapsed().as_micros() as u64;
        match &result {
            Ok(outcome) => {
                self.metrics.record_decision(outcome.decision.needs_review);
                self.metrics
                    .record_hallucinations(outcome.hallucinated.len() as u64);
                self.metrics.record_latency(latency_us);
                events::item_latency(latency_us);
                events::decision_recorded(
                    &outcome.content_id,
                    outcome.decision.needs_review,
                    outcome.decision.min_confidence,
                    &outcome.decision.reason,
                );
            }
            Err(err) => {
                self.metrics.record_failure(err.is_circuit_open());
                warn!(
                    content_id = %item.content_id,
                    kind = %err.kind(),
                    retryable = err.is_retryable(),
                    error = %err,
                    "Item failed"
                );
            }
        }

        result
    }

    async fn process_text(
        &self,
        item: &ContentItem,
        text: &str,
        model: &dyn TaggingModel,
    ) -> Result<TaggingOutcome> {
        let request = ModelRequest::Text {
            content_id: item.content_id.clone(),
            text: text.to_string(),
        };
        let raw = self.invoke(&self.text_model, &request, model).await?;

        let partition = self.taxonomy.validate_results(raw);
        let hallucinated = partition.invalid_tags();
        events::hallucination_detected(&item.content_id, model.name(), &hallucinated);

        let decision = self.router.route(&partition.valid);
        Ok(TaggingOutcome {
            content_id: item.content_id.clone(),
            tags: partition.valid,
            hallucinated,
            decision,
            frames_sampled: None,
        })
    }

    async fn process_video(
        &self,
        item: &ContentItem,
        video_url: &str,
        duration_seconds: f64,
        model: &dyn TaggingModel,
    ) -> Result<TaggingOutcome> {
        validate_format(video_url)?;
        let samples = self.sampling.sample(duration_seconds)?;
        let frames_sampled = samples.len();

        let per_frame: Vec<Vec<TagResult>> = stream::iter(samples)
            .map(|sample| self.tag_frame(item, video_url, sample, model))
            .buffered(self.sampling.max_concurrent_frames)
            .try_collect()
            .await?;

        let mut valid_frames = Vec::with_capacity(per_frame.len());
        let mut hallucinated: Vec<String> = Vec::new();
        for frame in per_frame {
            let partition = self.taxonomy.validate_results(frame);
            for tag in partition.invalid_tags() {
                if !hallucinated.contains(&tag) {
                    hallucinated.push(tag);
                }
            }
            valid_frames.push(partition.valid);
        }
        events::hallucination_detected(&item.content_id, model.name(), &hallucinated);

        let tags = self.sampling.aggregate(&valid_frames);
        debug!(
            content_id = %item.content_id,
            frames = frames_sampled,
            tags = tags.len(),
            "Aggregated video tags"
        );

        let decision = self.router.route(&tags);
        Ok(TaggingOutcome {
            content_id: item.content_id.clone(),
            tags,
            hallucinated,
            decision,
            frames_sampled: Some(frames_sampled),
        })
    }

    async fn tag_frame(
        &self,
        item: &ContentItem,
        video_url: &str,
        sample: FrameSample,
        model: &dyn TaggingModel,
    ) -> Result<Vec<TagResult>> {
        let request = ModelRequest::Frame {
            content_id: item.content_id.clone(),
            video_url: video_url.to_string(),
            sample,
        };
        self.invoke(&self.video_model, &request, model).await
    }

    async fn invoke(
        &self,
        dependency: &DependencyConfig,
        request: &ModelRequest,
        model: &dyn TaggingModel,
    ) -> Result<Vec<TagResult>> {
        let breaker = self
            .registry
            .get_or_create(&dependency.name, dependency.breaker.clone())?;
        let context = RetryContext::new(format!("{}.tag", dependency.name))
            .with_content_id(request.content_id());

        breaker
            .execute(|| retry(|| model.tag(request), &dependency.retry, &context))
            .await
    }
}
