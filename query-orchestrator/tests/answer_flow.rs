use std::{
    future::Future,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use ai_llm_service::AiLlmError;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use query_orchestrator::{
    CompletionProvider, Level, OrchestratorConfig, OrchestratorError, QueryOrchestrator,
    QueryRequest, ResolvedLevel,
};
use rag_store::{
    DocumentExtractor, EmbeddingsProvider, PageExtractor, RagError, RagStore, SourceDoc,
    StoreConfig,
};

/* --- stub collaborators --- */

struct WordEmbedder {
    calls: AtomicUsize,
}

impl EmbeddingsProvider for WordEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            let mut v = vec![0.0f32; 64];
            for word in text
                .split(|c: char| !c.is_ascii_alphabetic())
                .filter(|w| !w.is_empty())
            {
                let h = word
                    .to_ascii_lowercase()
                    .bytes()
                    .fold(7u32, |h, b| h.wrapping_mul(31).wrapping_add(b as u32));
                v[(h % 64) as usize] += 1.0;
            }
            v[63] += 0.01;
            Ok(v)
        })
    }
}

enum Mode {
    Echo,
    Hang,
}

struct StubCompleter {
    mode: Mode,
    calls: AtomicUsize,
    last_max_tokens: AtomicUsize,
}

impl StubCompleter {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
            last_max_tokens: AtomicUsize::new(0),
        }
    }
}

impl CompletionProvider for StubCompleter {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
        max_tokens: u32,
    ) -> Pin<Box<dyn Future<Output = Result<String, AiLlmError>> + Send + 'a>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_max_tokens
            .store(max_tokens as usize, Ordering::SeqCst);
        Box::pin(async move {
            match self.mode {
                Mode::Echo => Ok(format!("answer from {} prompt chars [Source 1]", prompt.len())),
                Mode::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(String::new())
                }
            }
        })
    }
}

/* --- fixtures --- */

struct Harness {
    _dir: tempfile::TempDir,
    store: Arc<RagStore>,
    embedder: Arc<WordEmbedder>,
    completer: Arc<StubCompleter>,
    orch: QueryOrchestrator,
}

async fn harness(mode: Mode, cfg: OrchestratorConfig) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut store_cfg =
        StoreConfig::new_default(dir.path().join("index"), dir.path().join("pdfs"));
    store_cfg.chunk_size = 60;
    store_cfg.chunk_overlap = 10;
    let store = Arc::new(RagStore::open(store_cfg).await.unwrap());
    let embedder = Arc::new(WordEmbedder {
        calls: AtomicUsize::new(0),
    });
    let completer = Arc::new(StubCompleter::new(mode));
    let orch = QueryOrchestrator::new(
        Arc::clone(&store),
        embedder.clone(),
        completer.clone(),
        cfg,
    );
    Harness {
        _dir: dir,
        store,
        embedder,
        completer,
        orch,
    }
}

fn extractor() -> Arc<dyn PageExtractor> {
    Arc::new(DocumentExtractor)
}

async fn ingest(h: &Harness, docs: Vec<SourceDoc>) {
    h.store
        .ingest_documents(docs, true, extractor(), h.embedder.as_ref())
        .await
        .unwrap();
}

fn corpus() -> Vec<SourceDoc> {
    let t = |n: &str, s: &str| SourceDoc::new(n, s.as_bytes().to_vec());
    vec![
        t(
            "housing.txt",
            "Housing subsidy for rural families in every district.\x0cEligibility requires land records and income proof.",
        ),
        t("solar.txt", "Solar pump scheme grants farmers ninety percent support for pumps."),
        t("startup.txt", "Startup policy offers seed funding and incubation to young founders."),
        t("mining.txt", "Mining lease renewal needs an environment clearance certificate."),
    ]
}

fn two_page_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let mut kids: Vec<Object> = Vec::new();
    for text in [
        "The policy is about affordable housing for workers",
        "Applicants must be residents of the state",
    ] {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => 2,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/* --- tests --- */

#[tokio::test]
async fn blank_question_is_rejected_without_upstream_calls() {
    let h = harness(Mode::Echo, OrchestratorConfig::default()).await;
    ingest(&h, corpus()).await;
    let before = h.embedder.calls.load(Ordering::SeqCst);

    let err = h.orch.answer(QueryRequest::new("   ")).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::InvalidRequest(_)));
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), before);
    assert_eq!(h.completer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn citations_are_bounded_ordered_and_traceable() {
    let h = harness(Mode::Echo, OrchestratorConfig::default()).await;
    ingest(&h, corpus()).await;

    let mut req = QueryRequest::new("Which scheme supports solar pumps for farmers?");
    req.top_k = Some(3);
    let resp = h.orch.answer(req).await.unwrap();

    assert_eq!(resp.used_top_k, 3);
    assert!(!resp.citations.is_empty() && resp.citations.len() <= 3);
    assert_eq!(resp.citations[0].source_file, "solar.txt");
    assert!(
        resp.citations
            .windows(2)
            .all(|w| w[0].score >= w[1].score)
    );
    for (i, c) in resp.citations.iter().enumerate() {
        assert!(resp.prompt.contains(&format!(
            "[Source {}] file: {} pages: {}-{}",
            i + 1,
            c.source_file,
            c.page_start,
            c.page_end
        )));
        assert!(c.snippet.chars().count() <= 500);
    }
    assert!(resp.answer.starts_with("answer from"));
}

#[tokio::test]
async fn identical_requests_give_identical_responses() {
    let h = harness(Mode::Echo, OrchestratorConfig::default()).await;
    ingest(&h, corpus()).await;

    let req = QueryRequest {
        question: "What documents prove eligibility for housing?".into(),
        top_k: Some(4),
        max_output_tokens: None,
        level: Some(Level::Technical),
    };
    let a = h.orch.answer(req.clone()).await.unwrap();
    let b = h.orch.answer(req).await.unwrap();
    assert_eq!(a.prompt, b.prompt);
    assert_eq!(a.answer, b.answer);
    assert_eq!(a.citations, b.citations);
    assert_eq!(a.level, ResolvedLevel::Technical);
}

#[tokio::test]
async fn out_of_range_knobs_are_clamped() {
    let h = harness(Mode::Echo, OrchestratorConfig::default()).await;
    ingest(&h, corpus()).await;

    let req = QueryRequest {
        question: "Tell me about startups".into(),
        top_k: Some(500),
        max_output_tokens: Some(1),
        level: None,
    };
    let resp = h.orch.answer(req).await.unwrap();
    assert_eq!(resp.used_top_k, 12);
    assert!(resp.citations.len() <= 12);
    assert_eq!(h.completer.last_max_tokens.load(Ordering::SeqCst), 128);
}

#[tokio::test]
async fn auto_level_uses_instance_default_then_heuristic() {
    let cfg = OrchestratorConfig {
        default_level: Some(ResolvedLevel::Summary),
        ..OrchestratorConfig::default()
    };
    let h = harness(Mode::Echo, cfg).await;
    ingest(&h, corpus()).await;
    let resp = h.orch.answer(QueryRequest::new("What is the subsidy amount?")).await.unwrap();
    assert_eq!(resp.level, ResolvedLevel::Summary);
    assert!(resp.prompt.ends_with("Summary:"));

    let h = harness(Mode::Echo, OrchestratorConfig::default()).await;
    ingest(&h, corpus()).await;
    let resp = h.orch.answer(QueryRequest::new("What is the subsidy amount?")).await.unwrap();
    assert_eq!(resp.level, ResolvedLevel::Technical);
}

#[tokio::test]
async fn completion_timeout_is_transient_upstream_error() {
    let cfg = OrchestratorConfig {
        llm_timeout: Duration::from_millis(50),
        ..OrchestratorConfig::default()
    };
    let h = harness(Mode::Hang, cfg).await;
    ingest(&h, corpus()).await;

    let err = h.orch.answer(QueryRequest::new("Solar pumps?")).await.unwrap_err();
    match err {
        OrchestratorError::Upstream {
            stage, transient, ..
        } => {
            assert_eq!(stage, "completion");
            assert!(transient);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn query_before_any_index_is_not_found() {
    let h = harness(Mode::Echo, OrchestratorConfig::default()).await;
    let err = h.orch.answer(QueryRequest::new("anything?")).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::NotFound));
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.completer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn single_pdf_policy_is_cited_with_pages() {
    let h = harness(Mode::Echo, OrchestratorConfig::default()).await;
    let report = h
        .store
        .ingest_documents(
            vec![SourceDoc::new("policy.pdf", two_page_pdf())],
            true,
            extractor(),
            h.embedder.as_ref(),
        )
        .await
        .unwrap();
    assert_eq!(report.files_processed, 1);
    assert!(report.chunks_added >= 1);

    let mut req = QueryRequest::new("What is the policy about?");
    req.top_k = Some(3);
    let resp = h.orch.answer(req).await.unwrap();
    assert!(
        resp.citations
            .iter()
            .any(|c| c.source_file == "policy.pdf" && c.page_start >= 1)
    );
}
