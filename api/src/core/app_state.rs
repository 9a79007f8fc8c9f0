use std::{str::FromStr, sync::Arc};

use ai_llm_service::LlmServiceProfiles;
use level_router::{LevelRouter, RouterConfig};
use query_orchestrator::{CompletionProvider, OrchestratorConfig, QueryOrchestrator, ServiceCompleter};
use rag_store::{
    DocumentExtractor, EmbeddingsProvider, PageExtractor, RagStore, ServiceEmbedder, StoreConfig,
};
use tracing::info;

use crate::{error_handler::AppError, middleware_layer::cors::CorsPolicy};

/// Which surface this process serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServerRole {
    /// One orchestrator instance with its own index.
    Level,
    /// Level router in front of several instances.
    Router,
}

impl FromStr for ServerRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "level" | "backend" => Ok(ServerRole::Level),
            "router" | "orchestrator" => Ok(ServerRole::Router),
            other => Err(AppError::Config(format!(
                "SERVER_ROLE must be 'level' or 'router', got {other:?}"
            ))),
        }
    }
}

impl ServerRole {
    pub fn from_env() -> Result<Self, AppError> {
        std::env::var("SERVER_ROLE").unwrap_or_default().parse()
    }
}

/// Transport-level settings shared by both roles.
#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub cors: CorsPolicy,
    pub max_upload_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            cors: CorsPolicy::Any,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl HttpConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            cors: CorsPolicy::from_env(),
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(d.max_upload_bytes),
        }
    }
}

/// Shared state of a level instance.
pub struct LevelState {
    pub orchestrator: Arc<QueryOrchestrator>,
    pub store: Arc<RagStore>,
    pub embedder: Arc<dyn EmbeddingsProvider>,
    pub extractor: Arc<dyn PageExtractor>,
    /// Provider profiles for `?deep=true` health probes.
    pub llm: Option<Arc<LlmServiceProfiles>>,
}

impl LevelState {
    /// Wires explicit collaborators (tests, embedding in other binaries).
    pub fn new(
        store: Arc<RagStore>,
        embedder: Arc<dyn EmbeddingsProvider>,
        completer: Arc<dyn CompletionProvider>,
        cfg: OrchestratorConfig,
    ) -> Self {
        let orchestrator = Arc::new(QueryOrchestrator::new(
            Arc::clone(&store),
            Arc::clone(&embedder),
            completer,
            cfg,
        ));
        Self {
            orchestrator,
            store,
            embedder,
            extractor: Arc::new(DocumentExtractor),
            llm: None,
        }
    }

    /// Loads provider profiles, opens the index and builds the orchestrator.
    pub async fn from_env() -> Result<Self, AppError> {
        let llm = Arc::new(
            LlmServiceProfiles::from_env().map_err(|e| AppError::Config(e.to_string()))?,
        );
        let store_cfg = StoreConfig::from_env().map_err(|e| AppError::Config(e.to_string()))?;
        let store = Arc::new(
            RagStore::open(store_cfg)
                .await
                .map_err(|e| AppError::Config(format!("cannot open index: {e}")))?,
        );
        let cfg = OrchestratorConfig::from_env();
        let embedder: Arc<dyn EmbeddingsProvider> =
            Arc::new(ServiceEmbedder::new(Arc::clone(&llm), cfg.embedding_timeout));
        let completer: Arc<dyn CompletionProvider> =
            Arc::new(ServiceCompleter::new(Arc::clone(&llm)));

        info!(
            default_level = cfg.default_level.map(|l| l.as_str()).unwrap_or("auto"),
            top_k = cfg.top_k,
            "level instance state ready"
        );
        let mut state = Self::new(store, embedder, completer, cfg);
        state.llm = Some(llm);
        Ok(state)
    }
}

/// Shared state of the level router.
pub struct RouterState {
    pub router: LevelRouter,
}

impl RouterState {
    /// Must be called inside a Tokio runtime (starts the health poller).
    pub fn from_env() -> Result<Self, AppError> {
        let llm = Arc::new(
            LlmServiceProfiles::from_env().map_err(|e| AppError::Config(e.to_string()))?,
        );
        let cfg = RouterConfig::from_env().map_err(|e| AppError::Config(e.to_string()))?;
        let router = LevelRouter::start(
            cfg,
            Arc::new(ServiceCompleter::new(llm)),
            Arc::new(DocumentExtractor),
        )
        .map_err(|e| AppError::Config(e.to_string()))?;
        Ok(Self { router })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_parse() {
        assert_eq!("".parse::<ServerRole>().ok(), Some(ServerRole::Level));
        assert_eq!("Router".parse::<ServerRole>().ok(), Some(ServerRole::Router));
        assert!("proxy".parse::<ServerRole>().is_err());
    }
}
