//! tagguard
//!
//! Tags content items with an upstream model, rejects hallucinated tags and
//! routes each item to auto-publish or human review.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tagguard_resilience::CircuitBreakerRegistry;
use tagguard_taxonomy::TaxonomyStore;
use tagguard_video::sample_frames;
use tagguard_worker::{
    BatchProcessor, ConfigOverrides, RecordedItem, RecordedModel, TaggingPipeline, WorkerConfig,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "tagguard")]
#[command(about = "Resilient content tagging with taxonomy enforcement", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Taxonomy file (overrides configuration)
    #[arg(short, long)]
    taxonomy: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Tag items from a JSON-lines file, replaying recorded model output
    Run {
        /// Input file, one item per line
        #[arg(short, long)]
        input: PathBuf,

        /// Confidence threshold for auto-publish
        #[arg(long)]
        threshold: Option<f64>,

        /// Items processed concurrently
        #[arg(long)]
        concurrency: Option<usize>,

        /// Fail the first N model calls with a throttling error
        #[arg(long, default_value_t = 0)]
        fail_first: u32,

        /// Print Prometheus metrics after the batch
        #[arg(long)]
        print_metrics: bool,
    },

    /// Load and validate the taxonomy, then print a summary
    CheckTaxonomy,

    /// Print the frame sample points for a video duration
    SampleFrames {
        /// Video duration in seconds
        #[arg(long)]
        duration: f64,

        /// Seconds between frames
        #[arg(long, default_value_t = 15.0)]
        interval: f64,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_format);

    match &cli.command {
        Command::Run {
            input,
            threshold,
            concurrency,
            fail_first,
            print_metrics,
        } => {
            let overrides = ConfigOverrides {
                taxonomy_path: cli.taxonomy.clone(),
                confidence_threshold: *threshold,
                concurrency: *concurrency,
            };
            let config = WorkerConfig::load(Some(cli.config.as_path()), &overrides)?;
            run(&config, input, *fail_first, *print_metrics).await
        }
        Command::CheckTaxonomy => {
            let overrides = ConfigOverrides {
                taxonomy_path: cli.taxonomy.clone(),
                ..Default::default()
            };
            let config = WorkerConfig::load(Some(cli.config.as_path()), &overrides)?;
            check_taxonomy(&config)
        }
        Command::SampleFrames { duration, interval } => {
            for sample in sample_frames(*duration, *interval)? {
                println!("{}", serde_json::to_string(&sample)?);
            }
            Ok(())
        }
    }
}

async fn run(config: &WorkerConfig, input: &Path, fail_first: u32, print_metrics: bool) -> Result<()> {
    let metrics_handle = init_metrics()?;

    // Without a taxonomy nothing can be validated, so load failure is fatal.
    let store = TaxonomyStore::new(&config.taxonomy_path);
    let taxonomy = store
        .get()
        .with_context(|| format!("cannot load taxonomy from {}", config.taxonomy_path.display()))?;

    let recorded = read_items(input)?;
    let items: Vec<_> = recorded.iter().map(|r| r.item.clone()).collect();
    let model = RecordedModel::new("recorded", &recorded).with_transient_failures(fail_first);

    let registry = Arc::new(CircuitBreakerRegistry::new());
    let pipeline = Arc::new(TaggingPipeline::new(config, taxonomy, registry)?);
    let processor = BatchProcessor::new(pipeline, config.concurrency);

    info!(
        items = items.len(),
        taxonomy_version = %processor.pipeline().taxonomy().version(),
        threshold = config.routing.confidence_threshold,
        "Starting batch"
    );

    let report = processor.process(&items, &model).await;

    for outcome in &report.outcomes {
        println!("{}", serde_json::to_string(outcome)?);
    }

    let snapshot = processor.pipeline().metrics().snapshot();
    info!(
        processed = snapshot.items_processed,
        auto_published = snapshot.auto_published,
        needs_review = snapshot.needs_review,
        failed = snapshot.failed_items,
        hallucinated_tags = snapshot.hallucinated_tags,
        review_rate = snapshot.review_rate(),
        avg_latency_us = snapshot.avg_latency_us(),
        model_calls = model.call_count(),
        "Batch summary"
    );
    for stats in processor.pipeline().registry().stats() {
        info!(
            dependency = %stats.name,
            state = stats.state.as_str(),
            consecutive_failures = stats.consecutive_failures,
            "Circuit breaker"
        );
    }

    if print_metrics {
        println!("{}", metrics_handle.render());
    }

    if !report.is_complete() {
        for failure in &report.failures {
            warn!(
                content_id = %failure.content_id,
                kind = %failure.kind,
                retryable = failure.retryable,
                error = %failure.error,
                "Item needs redelivery"
            );
        }
        anyhow::bail!("{} of {} items failed", report.failures.len(), report.total());
    }

    Ok(())
}

fn check_taxonomy(config: &WorkerConfig) -> Result<()> {
    let store = TaxonomyStore::load(&config.taxonomy_path)
        .with_context(|| format!("invalid taxonomy at {}", config.taxonomy_path.display()))?;
    let taxonomy = store.get()?;

    println!("version:  {}", taxonomy.version());
    println!("tags:     {}", taxonomy.len());
    for vertical in taxonomy.verticals() {
        let categories = taxonomy.categories(vertical);
        println!("  {} ({})", vertical, categories.join(", "));
    }
    Ok(())
}

fn read_items(path: &Path) -> Result<Vec<RecordedItem>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid item", path.display(), number + 1))
        })
        .collect()
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool, format: LogFormat) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("tagguard=debug")
    } else {
        EnvFilter::try_from_env("TAGGUARD_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("tagguard=info"))
    };

    // Decisions go to stdout, so logs go to stderr.
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    tagguard_telemetry::events::describe_metrics();

    info!("Metrics exporter initialized");
    Ok(handle)
}
