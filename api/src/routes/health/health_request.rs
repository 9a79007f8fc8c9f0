use ai_llm_service::health_service::HealthStatus;
use rag_store::IndexStats;
use serde::{Deserialize, Serialize};

/// Query parameters for GET /health.
#[derive(Debug, Default, Deserialize)]
pub struct HealthParams {
    /// Also probe the LLM providers.
    #[serde(default)]
    pub deep: bool,
}

/// Response payload for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub details: HealthDetails,
}

#[derive(Debug, Serialize)]
pub struct HealthDetails {
    pub stats: IndexStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub providers: Option<Vec<HealthStatus>>,
}
