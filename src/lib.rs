//! LLM Request Router
//!
//! Given a prompt and a routing priority, recommends which LLM(s) from a
//! fused model catalog best fit the request. The pipeline is: classify the
//! prompt, fuse the static catalog with the live analytics feed, filter
//! candidates, score them, and return a ranked list.
//!
//! # Architecture
//!
//! - [`registry`] loads and republishes the static model catalog
//! - [`benchmarks`] stores third-party benchmark metrics, keyed by model/source/metric
//! - [`feed`] polls the external analytics feed on a daily schedule
//! - [`fusion`] merges catalog and feed into one atomically-published snapshot
//! - [`classifier`] turns a prompt into a task type, category, complexity and sentiment
//! - [`scoring`] turns a model + classification + priority into a ranked score
//! - [`orchestrator`] wires classify -> filter -> score -> assemble into one request pipeline
//! - [`api`] exposes the pipeline over HTTP

pub mod api;
pub mod auth;
pub mod benchmarks;
pub mod classifier;
pub mod config;
pub mod feed;
pub mod fusion;
pub mod orchestrator;
pub mod registry;
pub mod scoring;
pub mod types;

pub use config::RouterConfig;
pub use types::{RouterError, RouterResult};

use benchmarks::BenchmarkStore;
use classifier::Classifier;
use feed::{AnalyticsFeedClient, FeedScheduler};
use fusion::FusionService;
use orchestrator::Orchestrator;
use registry::ModelRegistry;
use scoring::ScoringEngine;
use std::sync::Arc;

/// Owns every long-lived component and wires them together. One instance
/// per process; handlers reach it through [`api::AppState`].
pub struct RouterRuntime {
    pub config: RouterConfig,
    pub registry: Arc<ModelRegistry>,
    pub benchmark_store: Arc<BenchmarkStore>,
    pub feed_client: Arc<AnalyticsFeedClient>,
    pub feed_scheduler: Arc<FeedScheduler>,
    pub fusion: Arc<FusionService>,
    pub classifier: Arc<Classifier>,
    pub scoring: Arc<ScoringEngine>,
    pub orchestrator: Arc<Orchestrator>,
}

impl RouterRuntime {
    /// Build every component from configuration. Catalog load failure is
    /// fatal; classifier rules and the analytics feed degrade gracefully
    /// instead (spec.md §9 "Never block startup").
    pub fn new(config: RouterConfig) -> RouterResult<Self> {
        tracing::info!("initializing llm-router v{}", env!("CARGO_PKG_VERSION"));

        let registry = Arc::new(ModelRegistry::load(std::path::Path::new(&config.catalog.path))?);
        tracing::info!(models = registry.all().len(), "catalog loaded");

        let benchmark_store = Arc::new(BenchmarkStore::new(config.benchmark_store.clone()));

        let feed_client = Arc::new(AnalyticsFeedClient::new(
            config.feed.base_url.clone(),
            config.feed.api_key.clone(),
            config.feed.timeout_secs,
        )?);
        let feed_scheduler = FeedScheduler::new(feed_client.clone(), config.feed.refresh_hour_local);

        let fusion = Arc::new(FusionService::new(
            registry.clone(),
            config.fusion.max_snapshot_age_days,
            config.fusion.stale_quality_penalty,
            config.fusion.keyword_overlap_min,
        ));

        let classifier = Arc::new(Classifier::new_with_defaults());
        if let Some(rules_path) = &config.classifier.rules_path {
            if let Err(e) = classifier.reload(std::path::Path::new(rules_path)) {
                tracing::warn!(error = %e, path = %rules_path, "classifier rules failed to load, using built-in defaults");
            }
        }

        let scoring = Arc::new(ScoringEngine::new(config.scoring.clone()));
        let orchestrator = Arc::new(Orchestrator::new(classifier.clone(), fusion.clone(), scoring.clone()));

        Ok(Self {
            config,
            registry,
            benchmark_store,
            feed_client,
            feed_scheduler,
            fusion,
            classifier,
            scoring,
            orchestrator,
        })
    }

    /// Spawn the daily feed-refresh loop and run the HTTP server until shutdown.
    pub async fn start(self) -> RouterResult<()> {
        let fusion_on_refresh = self.fusion.clone();
        let fusion_on_failure = self.fusion.clone();
        self.feed_scheduler.spawn(
            move |rows, etag| fusion_on_refresh.refresh(rows, etag),
            move || fusion_on_failure.note_feed_failure(),
        );

        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let state = Arc::new(api::AppState {
            registry: self.registry,
            fusion: self.fusion,
            classifier: self.classifier,
            orchestrator: self.orchestrator,
            feed_client: self.feed_client,
            feed_scheduler: self.feed_scheduler,
            start_time: std::time::Instant::now(),
        });
        let app = api::router(state);

        tracing::info!(%addr, "listening");
        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(RouterError::Io)?;
        axum::serve(listener, app).await.map_err(RouterError::Io)?;

        Ok(())
    }
}

/// Initialize logging with the default level.
pub fn init_logging() {
    init_logging_with_level("info");
}

/// Initialize logging with the given default level, overridable via `RUST_LOG`.
pub fn init_logging_with_level(level: &str) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| format!("llm_router={},hyper=warn", level));

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| env_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(true).with_thread_ids(false).with_file(false))
        .init();
}
