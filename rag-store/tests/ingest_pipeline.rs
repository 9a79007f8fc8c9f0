use std::{
    future::Future,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use rag_store::{
    DocumentExtractor, EmbeddingsProvider, PageExtractor, RagError, RagQuery, RagStore,
    SourceDoc, StoreConfig,
};

/// Hashed bag-of-words embedding: deterministic and good enough to rank.
struct WordEmbedder {
    calls: AtomicUsize,
}

impl WordEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
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

struct FailingEmbedder;

impl EmbeddingsProvider for FailingEmbedder {
    fn embed<'a>(
        &'a self,
        _text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
        Box::pin(async { Err(RagError::Timeout(std::time::Duration::from_secs(1))) })
    }
}

/// Counts question embeddings separately from document embeddings.
struct TaskAwareEmbedder {
    inner: WordEmbedder,
    queries: AtomicUsize,
}

impl EmbeddingsProvider for TaskAwareEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
        self.inner.embed(text)
    }

    fn embed_query<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(text)
    }
}

fn extractor() -> Arc<dyn PageExtractor> {
    Arc::new(DocumentExtractor)
}

fn cfg(dir: &tempfile::TempDir) -> StoreConfig {
    let mut c = StoreConfig::new_default(dir.path().join("index"), dir.path().join("pdfs"));
    c.chunk_size = 40;
    c.chunk_overlap = 8;
    c
}

fn doc(name: &str, text: &str) -> SourceDoc {
    SourceDoc::new(name, text.as_bytes().to_vec())
}

fn corpus() -> Vec<SourceDoc> {
    vec![
        doc(
            "housing.txt",
            "Housing subsidy for rural families.\x0cEligibility requires land records and income proof.",
        ),
        doc("solar.txt", "Solar pump scheme grants farmers ninety percent support."),
        doc("startup.txt", "Startup policy offers seed funding and incubation."),
    ]
}

#[tokio::test]
async fn rebuild_indexes_every_document_and_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let store = RagStore::open(cfg(&dir)).await.unwrap();
    let emb = WordEmbedder::new();

    let report = store
        .ingest_documents(corpus(), true, extractor(), &emb)
        .await
        .unwrap();
    assert_eq!(report.files_processed, 3);
    assert!(report.chunks_added >= 3);
    assert_eq!(report.vectors, report.chunks_added);

    let stats = store.stats().await;
    assert_eq!(stats.document_count, 3);
    assert_eq!(stats.index_size, report.chunks_added);
    assert!(stats.index_exists);
    assert_eq!(stats.dimension, Some(64));

    drop(store);
    let reopened = RagStore::open(cfg(&dir)).await.unwrap();
    let again = reopened.stats().await;
    assert_eq!(again.document_count, 3);
    assert_eq!(again.chunk_count, report.chunks_added);

    // a second rebuild replaces instead of accumulating
    let report = reopened
        .ingest_documents(corpus()[..1].to_vec(), true, extractor(), &emb)
        .await
        .unwrap();
    assert_eq!(reopened.stats().await.document_count, 1);
    assert_eq!(reopened.stats().await.index_size, report.chunks_added);
}

#[tokio::test]
async fn append_is_a_union_without_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let store = RagStore::open(cfg(&dir)).await.unwrap();
    let emb = WordEmbedder::new();
    let docs = corpus();

    let first = store
        .ingest_documents(docs[..2].to_vec(), false, extractor(), &emb)
        .await
        .unwrap();
    let second = store
        .ingest_documents(docs.clone(), false, extractor(), &emb)
        .await
        .unwrap();

    assert_eq!(second.files_processed, 1);
    assert_eq!(second.skipped, vec!["housing.txt", "solar.txt"]);
    assert_eq!(second.vectors, first.chunks_added + second.chunks_added);

    let snap = store.snapshot().await;
    let mut ids: Vec<_> = snap.chunks.iter().map(|c| c.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), snap.len());
    assert_eq!(store.stats().await.document_count, 3);
}

#[tokio::test]
async fn same_bytes_under_two_names_keep_distinct_chunk_ids() {
    let dir = tempfile::tempdir().unwrap();
    let store = RagStore::open(cfg(&dir)).await.unwrap();
    let text = "Solar pump scheme grants farmers ninety percent support.";
    let report = store
        .ingest_documents(
            vec![doc("solar.txt", text), doc("solar-copy.txt", text)],
            false,
            extractor(),
            &WordEmbedder::new(),
        )
        .await
        .unwrap();
    assert_eq!(report.files_processed, 2);

    let snap = store.snapshot().await;
    let mut ids: Vec<_> = snap.chunks.iter().map(|c| c.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), snap.len());
}

#[tokio::test]
async fn malformed_file_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let store = RagStore::open(cfg(&dir)).await.unwrap();
    let emb = WordEmbedder::new();

    let report = store
        .ingest_documents(
            vec![
                doc("broken.pdf", "definitely not a pdf"),
                doc("ok.txt", "Pension scheme for senior citizens."),
            ],
            true,
            extractor(),
            &emb,
        )
        .await
        .unwrap();

    assert_eq!(report.files_processed, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].file, "broken.pdf");
    assert_eq!(store.stats().await.document_count, 1);
}

#[tokio::test]
async fn all_files_failing_commits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = RagStore::open(cfg(&dir)).await.unwrap();
    let emb = WordEmbedder::new();

    let err = store
        .ingest_documents(vec![doc("broken.pdf", "junk")], true, extractor(), &emb)
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Ingestion(_)));
    assert!(!store.stats().await.index_exists);
    assert!(matches!(
        store
            .rag_context(RagQuery { text: "x", top_k: 3 }, &emb)
            .await,
        Err(RagError::NotInitialized)
    ));
    assert_eq!(emb.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn embedding_failure_keeps_previous_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let store = RagStore::open(cfg(&dir)).await.unwrap();
    let emb = WordEmbedder::new();
    store
        .ingest_documents(corpus()[..1].to_vec(), false, extractor(), &emb)
        .await
        .unwrap();
    let before = store.stats().await;

    let err = store
        .ingest_documents(corpus(), true, extractor(), &FailingEmbedder)
        .await
        .unwrap_err();
    assert!(err.is_upstream());
    assert!(err.is_transient());

    let after = store.stats().await;
    assert_eq!(after.index_size, before.index_size);
    assert_eq!(after.document_count, 1);
}

#[tokio::test]
async fn failed_metadata_write_leaves_last_commit_loadable() {
    let dir = tempfile::tempdir().unwrap();
    let store = RagStore::open(cfg(&dir)).await.unwrap();
    let emb = WordEmbedder::new();
    let first = store
        .ingest_documents(corpus()[..1].to_vec(), false, extractor(), &emb)
        .await
        .unwrap();

    // a directory where the metadata temp file goes makes that write fail
    let blocker = dir.path().join("index").join("metadata.json.tmp");
    std::fs::create_dir_all(&blocker).unwrap();
    let err = store
        .ingest_documents(corpus()[1..].to_vec(), false, extractor(), &emb)
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Io(_)));
    assert_eq!(store.stats().await.index_size, first.vectors);

    let reopened = RagStore::open(cfg(&dir)).await.unwrap();
    assert_eq!(reopened.stats().await.document_count, 1);
    assert_eq!(reopened.stats().await.index_size, first.vectors);

    std::fs::remove_dir(&blocker).unwrap();
    let report = reopened
        .ingest_documents(corpus()[1..].to_vec(), false, extractor(), &emb)
        .await
        .unwrap();
    assert_eq!(report.files_processed, 2);
    drop(reopened);
    let again = RagStore::open(cfg(&dir)).await.unwrap();
    assert_eq!(again.stats().await.document_count, 3);
}

#[tokio::test]
async fn changed_content_under_same_name_needs_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let store = RagStore::open(cfg(&dir)).await.unwrap();
    let emb = WordEmbedder::new();
    store
        .ingest_documents(vec![doc("a.txt", "first version")], false, extractor(), &emb)
        .await
        .unwrap();

    let err = store
        .ingest_documents(vec![doc("a.txt", "second version")], false, extractor(), &emb)
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Ingestion(ref m) if m.contains("force_rebuild")));
}

#[tokio::test]
async fn retrieval_is_ordered_bounded_and_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let store = RagStore::open(cfg(&dir)).await.unwrap();
    let emb = WordEmbedder::new();
    store
        .ingest_documents(corpus(), true, extractor(), &emb)
        .await
        .unwrap();

    let q = RagQuery {
        text: "solar pump farmers",
        top_k: 2,
    };
    let hits = store.rag_context(q, &emb).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits[0].score >= hits[1].score);
    assert_eq!(hits[0].chunk.source_file, "solar.txt");

    let again = store
        .rag_context(
            RagQuery {
                text: "solar pump farmers",
                top_k: 2,
            },
            &emb,
        )
        .await
        .unwrap();
    let ids = |h: &[rag_store::RagHit]| h.iter().map(|x| x.chunk.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&hits), ids(&again));
}

#[tokio::test]
async fn questions_use_the_query_embedding() {
    let dir = tempfile::tempdir().unwrap();
    let store = RagStore::open(cfg(&dir)).await.unwrap();
    let emb = TaskAwareEmbedder {
        inner: WordEmbedder::new(),
        queries: AtomicUsize::new(0),
    };
    store
        .ingest_documents(corpus(), true, extractor(), &emb)
        .await
        .unwrap();
    assert_eq!(emb.queries.load(Ordering::SeqCst), 0);
    let documents = emb.inner.calls.load(Ordering::SeqCst);

    store
        .rag_context(
            RagQuery {
                text: "solar pump farmers",
                top_k: 1,
            },
            &emb,
        )
        .await
        .unwrap();
    assert_eq!(emb.queries.load(Ordering::SeqCst), 1);
    assert_eq!(emb.inner.calls.load(Ordering::SeqCst), documents + 1);
}

#[tokio::test]
async fn uploads_land_in_documents_dir_and_dir_ingest_picks_them_up() {
    let dir = tempfile::tempdir().unwrap();
    let store = RagStore::open(cfg(&dir)).await.unwrap();
    let emb = WordEmbedder::new();

    let saved = store
        .save_upload("../../escape/notes.txt", b"Water conservation rules.")
        .await
        .unwrap();
    assert_eq!(saved, dir.path().join("pdfs").join("notes.txt"));
    assert!(store.save_upload("evil.exe", b"x").await.is_err());

    let report = store.ingest_dir(false, extractor(), &emb).await.unwrap();
    assert_eq!(report.files_processed, 1);

    let unchanged = store.ingest_dir(false, extractor(), &emb).await.unwrap();
    assert_eq!(unchanged.files_processed, 0);
    assert_eq!(unchanged.skipped, vec!["notes.txt"]);
}
