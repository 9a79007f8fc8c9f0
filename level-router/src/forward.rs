//! `/query` forwarding.

use query_orchestrator::{QueryRequest, ResolvedLevel, level};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::{LevelRouter, RouterError};

impl LevelRouter {
    /// Resolves the level and forwards the question to that instance.
    ///
    /// The forwarded request always carries a concrete level, so the
    /// instance answers with the same template the router picked. The
    /// instance's JSON body is returned unchanged.
    ///
    /// # Errors
    /// - [`RouterError::InvalidRequest`] for a blank question
    /// - [`RouterError::Downstream`] for a non-2xx reply
    /// - [`RouterError::Unreachable`] for timeouts, refusals, bad bodies
    #[instrument(skip_all, fields(level = tracing::field::Empty))]
    pub async fn route(&self, mut req: QueryRequest) -> Result<Value, RouterError> {
        if req.question.trim().is_empty() {
            return Err(RouterError::InvalidRequest(
                "question must not be empty".into(),
            ));
        }
        let level = level::resolve(req.level, None, &req.question);
        tracing::Span::current().record("level", level.as_str());
        req.level = Some(level.into());

        let url = format!("{}/query", self.cfg.url(level));
        let resp = self
            .http
            .post(&url)
            .timeout(self.cfg.forward_timeout)
            .json(&req)
            .send()
            .await
            .map_err(|e| {
                warn!(%url, error = %e, "query forward failed");
                RouterError::unreachable(level, &e)
            })?;

        let body = read_json(level, resp).await?;
        info!(%level, "query forwarded");
        Ok(body)
    }
}

/// 2xx → parsed JSON; otherwise [`RouterError::Downstream`] with the body.
pub(crate) async fn read_json(
    level: ResolvedLevel,
    resp: reqwest::Response,
) -> Result<Value, RouterError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        warn!(%level, status = status.as_u16(), "downstream returned error");
        return Err(RouterError::Downstream {
            level,
            status: status.as_u16(),
            body,
        });
    }
    resp.json::<Value>()
        .await
        .map_err(|e| RouterError::unreachable(level, &e))
}
