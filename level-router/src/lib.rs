//! Front door for the multi-server deployment.
//!
//! - Resolves the answer level (same heuristic as the level instances) and
//!   forwards `/query` to the matching instance
//! - Polls every instance's `/health` in the background
//! - Fans uploads out across levels, compressing text on the way down

mod config;
mod error;
mod forward;
mod health;
mod ingest;

pub use config::RouterConfig;
pub use error::RouterError;
pub use health::{HealthAggregator, LevelHealth, RouterHealth, poll_once};
pub use ingest::{MultiLevelIngest, Upload};

use std::sync::Arc;

use query_orchestrator::CompletionProvider;
use rag_store::PageExtractor;
use tracing::info;

/// Shared router service.
pub struct LevelRouter {
    cfg: RouterConfig,
    http: reqwest::Client,
    health: HealthAggregator,
    completer: Arc<dyn CompletionProvider>,
    extractor: Arc<dyn PageExtractor>,
}

impl LevelRouter {
    /// Builds the HTTP client and starts the health poller.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn start(
        cfg: RouterConfig,
        completer: Arc<dyn CompletionProvider>,
        extractor: Arc<dyn PageExtractor>,
    ) -> Result<Self, RouterError> {
        cfg.validate()?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("level-router/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let health = HealthAggregator::spawn(
            http.clone(),
            cfg.targets(),
            cfg.health_interval,
            cfg.health_timeout,
        );
        info!(
            general = cfg.url(query_orchestrator::ResolvedLevel::General),
            summary = cfg.url(query_orchestrator::ResolvedLevel::Summary),
            technical = cfg.url(query_orchestrator::ResolvedLevel::Technical),
            interval_secs = cfg.health_interval.as_secs(),
            "level router started"
        );
        Ok(Self {
            cfg,
            http,
            health,
            completer,
            extractor,
        })
    }

    pub fn config(&self) -> &RouterConfig {
        &self.cfg
    }

    /// Latest health snapshot; never blocks on downstream instances.
    pub async fn health(&self) -> Arc<RouterHealth> {
        self.health.current().await
    }

    /// Stops background polling.
    pub fn shutdown(&self) {
        info!("stopping level health poller");
        self.health.shutdown();
    }

    pub fn is_stopped(&self) -> bool {
        self.health.is_stopped()
    }
}
