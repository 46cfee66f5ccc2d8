//! Pipeline and batch behavior against mock models
//!
//! Mocks count their calls so tests can assert exactly how many times the
//! upstream model was reached through breakers and retries.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tagguard_core::{Error, ErrorKind, Result, TagResult};
use tagguard_resilience::{CircuitBreakerRegistry, CircuitState};
use tagguard_routing::NO_VALID_TAGS_REASON;
use tagguard_taxonomy::Taxonomy;
use tagguard_worker::{
    BatchProcessor, ContentItem, ModelRequest, TaggingModel, TaggingPipeline, WorkerConfig,
};

const TAXONOMY: &str = r#"{
    "version": "test-1",
    "totalTagCount": 5,
    "tags": ["grilling", "baking", "italian", "yoga", "other"],
    "groupings": {"food": {"cooking-methods": ["grilling", "baking"], "cuisines": ["italian"]}},
    "synonyms": {"bbq": "grilling"}
}"#;

/// Returns fixed text tags and per-frame tags by frame index
struct StaticModel {
    text_tags: Vec<TagResult>,
    frame_tags: Vec<Vec<TagResult>>,
    calls: AtomicU32,
}

impl StaticModel {
    fn text(tags: &[(&str, f64)]) -> Self {
        Self {
            text_tags: tags.iter().map(|(t, c)| TagResult::new(*t, *c)).collect(),
            frame_tags: Vec::new(),
            calls: AtomicU32::new(0),
        }
    }

    fn frames(frames: Vec<Vec<(&str, f64)>>) -> Self {
        Self {
            text_tags: Vec::new(),
            frame_tags: frames
                .into_iter()
                .map(|f| f.into_iter().map(|(t, c)| TagResult::new(t, c)).collect())
                .collect(),
            calls: AtomicU32::new(0),
        }
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaggingModel for StaticModel {
    fn name(&self) -> &str {
        "static"
    }

    async fn tag(&self, request: &ModelRequest) -> Result<Vec<TagResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match request {
            ModelRequest::Text { content_id, .. } if content_id.starts_with("bad") => Err(
                Error::fatal(ErrorKind::InvalidRequest, "ValidationException: bad prompt"),
            ),
            ModelRequest::Text { .. } => Ok(self.text_tags.clone()),
            ModelRequest::Frame { sample, .. } => Ok(self
                .frame_tags
                .get(sample.frame_index)
                .cloned()
                .unwrap_or_default()),
        }
    }
}

/// Fails the first `failures` calls with `kind`, then returns `tags`
struct FlakyModel {
    kind: ErrorKind,
    failures: u32,
    tags: Vec<TagResult>,
    calls: AtomicU32,
}

impl FlakyModel {
    fn new(kind: ErrorKind, failures: u32) -> Self {
        Self {
            kind,
            failures,
            tags: vec![TagResult::new("grilling", 0.95)],
            calls: AtomicU32::new(0),
        }
    }

    fn always_failing(kind: ErrorKind) -> Self {
        Self::new(kind, u32::MAX)
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaggingModel for FlakyModel {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn tag(&self, _request: &ModelRequest) -> Result<Vec<TagResult>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(Error::processing(self.kind, format!("{} from upstream", self.kind)));
        }
        Ok(self.tags.clone())
    }
}

fn test_config() -> WorkerConfig {
    let mut config = WorkerConfig::default();
    for dependency in [&mut config.text_model, &mut config.video_model] {
        dependency.retry.initial_delay_ms = 10;
        dependency.retry.max_delay_ms = 100;
        dependency.retry.jitter = 0.0;
        dependency.breaker.failure_threshold = 2;
        dependency.breaker.timeout_ms = 30_000;
    }
    config
}

fn pipeline_with(config: &WorkerConfig) -> TaggingPipeline {
    let taxonomy = Arc::new(Taxonomy::from_json_str(TAXONOMY).unwrap());
    TaggingPipeline::new(config, taxonomy, Arc::new(CircuitBreakerRegistry::new())).unwrap()
}

fn pipeline() -> TaggingPipeline {
    pipeline_with(&test_config())
}

#[tokio::test]
async fn test_text_item_auto_published() {
    let pipeline = pipeline();
    let model = StaticModel::text(&[("grilling", 0.92), ("italian", 0.85)]);

    let outcome = pipeline
        .process(&ContentItem::text("t1", "Wood-fired pizza"), &model)
        .await
        .unwrap();

    assert_eq!(outcome.tags.len(), 2);
    assert!(outcome.hallucinated.is_empty());
    assert!(!outcome.decision.needs_review);
    assert_eq!(outcome.decision.min_confidence, 0.85);
    assert_eq!(model.call_count(), 1);

    let snapshot = pipeline.metrics().snapshot();
    assert_eq!(snapshot.auto_published, 1);
    assert_eq!(snapshot.items_processed, 1);
}

#[tokio::test]
async fn test_hallucinated_tags_never_reach_the_outcome() {
    let pipeline = pipeline();
    let model = StaticModel::text(&[("grilling", 0.95), ("space-cooking", 0.99), ("bbq", 0.9)]);

    let outcome = pipeline
        .process(&ContentItem::text("t2", "Backyard cookout"), &model)
        .await
        .unwrap();

    let tags: Vec<&str> = outcome.tags.iter().map(|t| t.tag.as_str()).collect();
    assert_eq!(tags, vec!["grilling"]);
    assert_eq!(outcome.hallucinated, vec!["space-cooking", "bbq"]);
    assert!(!outcome.decision.needs_review);
    assert_eq!(pipeline.metrics().snapshot().hallucinated_tags, 2);
}

#[tokio::test]
async fn test_no_valid_tags_needs_review() {
    let pipeline = pipeline();
    let model = StaticModel::text(&[("made-up", 0.99)]);

    let outcome = pipeline
        .process(&ContentItem::text("t3", "???"), &model)
        .await
        .unwrap();

    assert!(outcome.tags.is_empty());
    assert!(outcome.decision.needs_review);
    assert_eq!(outcome.decision.reason, NO_VALID_TAGS_REASON);
    assert_eq!(outcome.decision.min_confidence, 0.0);
}

#[tokio::test]
async fn test_low_confidence_routed_to_review() {
    let pipeline = pipeline();
    let model = StaticModel::text(&[("grilling", 0.95), ("baking", 0.6)]);

    let outcome = pipeline
        .process(&ContentItem::text("t4", "Bake sale"), &model)
        .await
        .unwrap();

    assert!(outcome.decision.needs_review);
    assert!(outcome.decision.reason.contains("baking (0.6)"));
    assert_eq!(pipeline.metrics().snapshot().needs_review, 1);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_absorbed_by_retry() {
    let pipeline = pipeline();
    let model = FlakyModel::new(ErrorKind::Throttling, 2);

    let outcome = pipeline
        .process(&ContentItem::text("t5", "Ribs"), &model)
        .await
        .unwrap();

    assert_eq!(outcome.tags[0].tag, "grilling");
    assert_eq!(model.call_count(), 3);

    let breaker = pipeline.registry().get("text-model").unwrap();
    assert_eq!(breaker.stats().consecutive_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn test_non_retryable_error_called_once() {
    let pipeline = pipeline();
    let model = FlakyModel::always_failing(ErrorKind::InvalidRequest);

    let err = pipeline
        .process(&ContentItem::text("t6", "Ribs"), &model)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert_eq!(model.call_count(), 1);
    assert_eq!(pipeline.metrics().snapshot().failed_items, 1);
}

#[tokio::test(start_paused = true)]
async fn test_breaker_opens_and_short_circuits_later_items() {
    let pipeline = pipeline();
    let model = FlakyModel::always_failing(ErrorKind::Unavailable);

    // Two items exhaust their retries; each counts as one breaker failure.
    for id in ["a", "b"] {
        let err = pipeline
            .process(&ContentItem::text(id, "x"), &model)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }
    assert_eq!(model.call_count(), 6);

    let err = pipeline
        .process(&ContentItem::text("c", "x"), &model)
        .await
        .unwrap_err();
    assert!(err.is_circuit_open());
    assert_eq!(model.call_count(), 6);

    let breaker = pipeline.registry().get("text-model").unwrap();
    assert_eq!(breaker.state(), CircuitState::Open);
    assert!(pipeline.registry().get("video-model").is_none());

    let snapshot = pipeline.metrics().snapshot();
    assert_eq!(snapshot.failed_items, 3);
    assert_eq!(snapshot.circuit_rejections, 1);
}

#[tokio::test]
async fn test_video_frames_aggregated_and_routed() {
    let pipeline = pipeline();
    let model = StaticModel::frames(vec![
        vec![("grilling", 0.9)],
        vec![("grilling", 0.7), ("alien-food", 0.8)],
        vec![("baking", 0.5)],
        vec![],
    ]);

    let outcome = pipeline
        .process(&ContentItem::video("v1", "https://cdn.example.com/v1.mp4?sig=1", 45.0), &model)
        .await
        .unwrap();

    assert_eq!(outcome.frames_sampled, Some(4));
    assert_eq!(model.call_count(), 4);
    assert_eq!(outcome.hallucinated, vec!["alien-food"]);

    let tags: Vec<&str> = outcome.tags.iter().map(|t| t.tag.as_str()).collect();
    assert_eq!(tags, vec!["grilling", "baking"]);
    assert!((outcome.tags[0].confidence - 0.8).abs() < 1e-9);

    assert!(outcome.decision.needs_review);
    assert!(outcome.decision.reason.contains("grilling"));
    assert!(outcome.decision.reason.contains("baking"));
}

#[tokio::test]
async fn test_video_input_errors_skip_the_model() {
    let pipeline = pipeline();
    let model = StaticModel::frames(vec![]);

    let err = pipeline
        .process(&ContentItem::video("v2", "https://cdn.example.com/v2.webm", 30.0), &model)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Format(_)));

    let err = pipeline
        .process(&ContentItem::video("v3", "v3.mp4", 5400.0), &model)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DurationExceeded { .. }));

    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn test_batch_reports_failures_in_input_order() {
    let pipeline = Arc::new(pipeline());
    let processor = BatchProcessor::new(pipeline, 3);
    let model = StaticModel::text(&[("yoga", 0.9)]);

    let items: Vec<ContentItem> = ["i1", "bad-1", "i2", "i3", "i4"]
        .iter()
        .map(|id| ContentItem::text(*id, "Morning flow"))
        .collect();

    let report = processor.process(&items, &model).await;

    assert_eq!(report.total(), 5);
    assert!(!report.is_complete());
    assert_eq!(report.failed_ids(), vec!["bad-1"]);
    assert!(!report.failures[0].retryable);

    let ids: Vec<&str> = report.outcomes.iter().map(|o| o.content_id.as_str()).collect();
    assert_eq!(ids, vec!["i1", "i2", "i3", "i4"]);
    assert_eq!(report.needs_review(), 0);
}
