use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
    time::Duration,
};

use ai_llm_service::AiLlmError;
use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use level_router::{LevelRouter, RouterConfig, RouterError, RouterHealth, Upload};
use query_orchestrator::{CompletionProvider, Level, QueryRequest, ResolvedLevel};
use rag_store::DocumentExtractor;
use serde_json::{Value, json};

/* --- mock level instance --- */

struct MockLevel {
    name: &'static str,
    vectors: u64,
    health: StatusCode,
    queries: Mutex<Vec<Value>>,
    uploads: Mutex<Vec<(String, String)>>,
}

async fn health(State(m): State<Arc<MockLevel>>) -> Response {
    if m.health.is_success() {
        Json(json!({"status":"ok","details":{"stats":{"index_size":m.vectors}}})).into_response()
    } else {
        (m.health, "boom").into_response()
    }
}

async fn query(State(m): State<Arc<MockLevel>>, Json(body): Json<Value>) -> Json<Value> {
    m.queries.lock().unwrap().push(body.clone());
    Json(json!({"answer": format!("from {}", m.name), "level": body["level"]}))
}

async fn ingest(State(m): State<Arc<MockLevel>>, mut mp: Multipart) -> Json<Value> {
    let mut n = 0;
    while let Some(field) = mp.next_field().await.unwrap() {
        let name = field.file_name().unwrap_or_default().to_string();
        let text = String::from_utf8_lossy(&field.bytes().await.unwrap()).to_string();
        m.uploads.lock().unwrap().push((name, text));
        n += 1;
    }
    Json(json!({"files_processed": n, "level": m.name}))
}

async fn spawn_level(name: &'static str, vectors: u64, status: StatusCode) -> (String, Arc<MockLevel>) {
    let mock = Arc::new(MockLevel {
        name,
        vectors,
        health: status,
        queries: Mutex::new(vec![]),
        uploads: Mutex::new(vec![]),
    });
    let app = Router::new()
        .route("/health", get(health))
        .route("/query", post(query))
        .route("/ingest", post(ingest))
        .with_state(Arc::clone(&mock));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), mock)
}

/// Address with nothing listening on it.
async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/* --- stub completion --- */

#[derive(Default)]
struct RecordingCompleter {
    prompts: Mutex<Vec<String>>,
}

impl CompletionProvider for RecordingCompleter {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
        _max_tokens: u32,
    ) -> Pin<Box<dyn Future<Output = Result<String, AiLlmError>> + Send + 'a>> {
        Box::pin(async move {
            let mut p = self.prompts.lock().unwrap();
            p.push(prompt.to_string());
            Ok(format!("compressed summary number {}", p.len()))
        })
    }
}

fn router_cfg(general: String, summary: String, technical: String) -> RouterConfig {
    RouterConfig {
        general_url: general,
        summary_url: summary,
        technical_url: technical,
        health_interval: Duration::from_secs(3600),
        health_timeout: Duration::from_secs(1),
        forward_timeout: Duration::from_secs(5),
        ingest_timeout: Duration::from_secs(5),
        ..RouterConfig::default()
    }
}

fn start(cfg: RouterConfig, completer: Arc<RecordingCompleter>) -> LevelRouter {
    LevelRouter::start(cfg, completer, Arc::new(DocumentExtractor)).unwrap()
}

async fn wait_polled(router: &LevelRouter) -> Arc<RouterHealth> {
    for _ in 0..200 {
        let h = router.health().await;
        if h.levels.values().all(|l| l.checked_at.is_some()) {
            return h;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("health was never polled");
}

/* --- tests --- */

#[tokio::test]
async fn health_reports_ok_error_and_down_levels() {
    let (general, _) = spawn_level("general", 42, StatusCode::OK).await;
    let (summary, _) = spawn_level("summary", 0, StatusCode::INTERNAL_SERVER_ERROR).await;
    let router = start(router_cfg(general, summary, dead_url().await), Arc::default());

    let h = wait_polled(&router).await;
    assert_eq!(h.orchestrator, "ok");
    let g = h.level(ResolvedLevel::General).unwrap();
    assert_eq!(g.status, "ok");
    assert_eq!(g.vectors, Some(42));
    assert_eq!(h.level(ResolvedLevel::Summary).unwrap().status, "error 500");
    assert_eq!(h.level(ResolvedLevel::Technical).unwrap().status, "down");

    router.shutdown();
}

#[tokio::test]
async fn auto_questions_are_forwarded_with_a_concrete_level() {
    let (general, g) = spawn_level("general", 1, StatusCode::OK).await;
    let (summary, s) = spawn_level("summary", 1, StatusCode::OK).await;
    let (technical, t) = spawn_level("technical", 1, StatusCode::OK).await;
    let router = start(router_cfg(general, summary, technical), Arc::default());

    let out = router
        .route(QueryRequest::new("Give me an overview of the housing scheme"))
        .await
        .unwrap();
    assert_eq!(out["answer"], "from summary");
    assert_eq!(s.queries.lock().unwrap()[0]["level"], "summary");

    let out = router
        .route(QueryRequest::new("What is the subsidy amount?"))
        .await
        .unwrap();
    assert_eq!(out["answer"], "from technical");

    let mut req = QueryRequest::new("What is the subsidy amount?");
    req.level = Some(Level::General);
    req.top_k = Some(3);
    router.route(req).await.unwrap();
    let forwarded = g.queries.lock().unwrap()[0].clone();
    assert_eq!(forwarded["level"], "general");
    assert_eq!(forwarded["top_k"], 3);
    assert_eq!(t.queries.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn one_dead_level_does_not_block_the_others() {
    let (summary, _) = spawn_level("summary", 1, StatusCode::OK).await;
    let (technical, _) = spawn_level("technical", 1, StatusCode::OK).await;
    let router = start(router_cfg(dead_url().await, summary, technical), Arc::default());

    let mut req = QueryRequest::new("hello");
    req.level = Some(Level::General);
    match router.route(req).await.unwrap_err() {
        RouterError::Unreachable {
            level, transient, ..
        } => {
            assert_eq!(level, ResolvedLevel::General);
            assert!(transient);
        }
        other => panic!("unexpected {other:?}"),
    }

    let mut req = QueryRequest::new("hello");
    req.level = Some(Level::Summary);
    assert_eq!(router.route(req).await.unwrap()["answer"], "from summary");
}

#[tokio::test]
async fn blank_question_is_rejected_before_forwarding() {
    let (url, m) = spawn_level("general", 1, StatusCode::OK).await;
    let router = start(router_cfg(url.clone(), url.clone(), url), Arc::default());
    let err = router.route(QueryRequest::new("  ")).await.unwrap_err();
    assert!(matches!(err, RouterError::InvalidRequest(_)));
    assert!(m.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn uploads_fan_out_with_compressed_summaries() {
    let (general, g) = spawn_level("general", 1, StatusCode::OK).await;
    let (summary, s) = spawn_level("summary", 1, StatusCode::OK).await;
    let (technical, t) = spawn_level("technical", 1, StatusCode::OK).await;
    let completer = Arc::new(RecordingCompleter::default());
    let router = start(router_cfg(general, summary, technical), Arc::clone(&completer));

    let body = "Housing subsidy of two lakh rupees.\x0cEligibility needs land records.";
    let out = router
        .ingest_all_levels(vec![Upload::new("dir/housing.txt", body.as_bytes().to_vec())])
        .await
        .unwrap();
    assert_eq!(out.technical["level"], "technical");
    assert_eq!(out.summary["level"], "summary");
    assert_eq!(out.general["level"], "general");

    let tech = t.uploads.lock().unwrap().clone();
    assert_eq!(tech, vec![("housing.txt".to_string(), body.to_string())]);

    let sum = s.uploads.lock().unwrap().clone();
    assert_eq!(sum.len(), 1);
    assert!(sum[0].0.starts_with("summary_l1_") && sum[0].0.ends_with(".txt"));
    assert_eq!(sum[0].1, "compressed summary number 1");

    let gen_docs = g.uploads.lock().unwrap().clone();
    assert!(gen_docs[0].0.starts_with("summary_l0_"));
    assert_eq!(gen_docs[0].1, "compressed summary number 2");

    let prompts = completer.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("Eligibility needs land records."));
    assert!(prompts[0].contains("at the summary level"));
    assert!(prompts[1].contains("compressed summary number 1"));
    assert!(prompts[1].contains("at the general level"));
}

#[tokio::test]
async fn unsupported_upload_is_rejected() {
    let (url, m) = spawn_level("technical", 1, StatusCode::OK).await;
    let router = start(router_cfg(url.clone(), url.clone(), url), Arc::default());
    let err = router
        .ingest_all_levels(vec![Upload::new("notes.docx", b"x".to_vec())])
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::InvalidRequest(_)));
    assert!(m.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn shutdown_stops_the_poller() {
    let (url, _) = spawn_level("general", 1, StatusCode::OK).await;
    let router = start(router_cfg(url.clone(), url.clone(), url), Arc::default());
    router.shutdown();
    for _ in 0..100 {
        if router.is_stopped() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("poller still running");
}
