//! Background health polling of the level instances.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use futures::future::join_all;
use query_orchestrator::ResolvedLevel;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{sync::RwLock, task::JoinHandle, time::Instant};
use tracing::{debug, warn};

/// Last observed state of one level instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelHealth {
    /// `ok`, `error <code>`, `down`, or `pending` before the first poll.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vectors: Option<u64>,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<String>,
}

impl LevelHealth {
    fn pending() -> Self {
        Self {
            status: "pending".into(),
            vectors: None,
            latency_ms: 0,
            checked_at: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Health payload served by the router's `GET /health`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouterHealth {
    pub orchestrator: String,
    pub levels: BTreeMap<String, LevelHealth>,
}

impl RouterHealth {
    fn pending(levels: &[(ResolvedLevel, String)]) -> Self {
        Self {
            orchestrator: "ok".into(),
            levels: levels
                .iter()
                .map(|(l, _)| (l.to_string(), LevelHealth::pending()))
                .collect(),
        }
    }

    pub fn level(&self, level: ResolvedLevel) -> Option<&LevelHealth> {
        self.levels.get(level.as_str())
    }
}

/// Owns the poller task and the published snapshot.
///
/// Readers clone the `Arc<RouterHealth>`; the poller swaps in a whole new
/// snapshot after each round.
pub struct HealthAggregator {
    snapshot: Arc<RwLock<Arc<RouterHealth>>>,
    task: JoinHandle<()>,
}

impl HealthAggregator {
    /// Starts polling immediately, then every `interval`.
    pub fn spawn(
        http: reqwest::Client,
        targets: Vec<(ResolvedLevel, String)>,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        let snapshot = Arc::new(RwLock::new(Arc::new(RouterHealth::pending(&targets))));
        let shared = Arc::clone(&snapshot);

        let task = tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                let next = poll_once(&http, &targets, timeout).await;
                *shared.write().await = Arc::new(next);
            }
        });

        Self { snapshot, task }
    }

    pub async fn current(&self) -> Arc<RouterHealth> {
        Arc::clone(&*self.snapshot.read().await)
    }

    /// Stops the poller. The last snapshot stays readable.
    pub fn shutdown(&self) {
        self.task.abort();
    }

    pub fn is_stopped(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for HealthAggregator {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Probes every level concurrently; one slow instance never delays the others
/// beyond `timeout`.
pub async fn poll_once(
    http: &reqwest::Client,
    targets: &[(ResolvedLevel, String)],
    timeout: Duration,
) -> RouterHealth {
    let probes = targets.iter().map(|(level, url)| async move {
        (level.to_string(), probe(http, *level, url, timeout).await)
    });
    RouterHealth {
        orchestrator: "ok".into(),
        levels: join_all(probes).await.into_iter().collect(),
    }
}

async fn probe(
    http: &reqwest::Client,
    level: ResolvedLevel,
    base: &str,
    timeout: Duration,
) -> LevelHealth {
    let url = format!("{base}/health");
    let started = Instant::now();
    let result = http.get(&url).timeout(timeout).send().await;
    let latency_ms = started.elapsed().as_millis() as u64;
    let checked_at = Some(chrono::Utc::now().to_rfc3339());

    let (status, vectors) = match result {
        Ok(resp) if resp.status().is_success() => {
            let body = resp.json::<Value>().await.unwrap_or(Value::Null);
            ("ok".to_string(), vector_count(&body))
        }
        Ok(resp) => {
            let code = resp.status().as_u16();
            warn!(%level, code, "level health returned error status");
            (format!("error {code}"), None)
        }
        Err(e) => {
            warn!(%level, error = %e, "level health check failed");
            ("down".to_string(), None)
        }
    };
    debug!(%level, %status, latency_ms, "level probed");

    LevelHealth {
        status,
        vectors,
        latency_ms,
        checked_at,
    }
}

/// Index size reported by a level instance, in either payload shape.
fn vector_count(body: &Value) -> Option<u64> {
    body.pointer("/details/stats/index_size")
        .or_else(|| body.pointer("/stats/vectors"))
        .and_then(Value::as_u64)
}
