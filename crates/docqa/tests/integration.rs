//! Pipeline tests over the in-memory store, with deterministic embedding
//! and scripted completion stubs standing in for the external services.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use docqa::config::{ChunkingConfig, Config, IndexingConfig, RetrievalConfig};
use docqa::delete::delete_document;
use docqa::ingest::{index_document, upload_document, UploadRequest};
use docqa::query::{answer_query, QueryRequest};
use docqa_core::answer::NO_CONTEXT_ANSWER;
use docqa_core::completion::{CompletionModel, CompletionRequest};
use docqa_core::embedding::Embedder;
use docqa_core::error::ErrorKind;
use docqa_core::models::{DocStatus, Document, FileRecord, NewDocument};
use docqa_core::store::memory::InMemoryStore;
use docqa_core::store::Store;

/// Deterministic embedding derived from the text bytes.
struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    fn new() -> Self {
        Self { dims: 8 }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        for (i, b) in text.bytes().enumerate() {
            v[i % self.dims] += b as f32;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        v.into_iter().map(|x| x / norm).collect()
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash-embedder"
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector_for(text))
    }
}

/// Embedder that starts failing at the n-th call (1-based).
struct FailingEmbedder {
    inner: HashEmbedder,
    fail_from: usize,
    calls: AtomicUsize,
}

impl FailingEmbedder {
    fn failing_from(call: usize) -> Self {
        Self {
            inner: HashEmbedder::new(),
            fail_from: call,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Embedder for FailingEmbedder {
    fn model_name(&self) -> &str {
        "failing-embedder"
    }
    fn dims(&self) -> usize {
        self.inner.dims
    }
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call >= self.fail_from {
            anyhow::bail!("embedding service unavailable");
        }
        self.inner.embed(text).await
    }
}

/// Completion model that replays scripted responses in order.
struct ScriptedModel {
    replies: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }
    async fn complete(&self, _req: &CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            anyhow::bail!("no scripted reply left");
        }
        Ok(replies.remove(0))
    }
}

/// Poll a document until it leaves `indexing` status.
async fn wait_for_terminal(store: &InMemoryStore, id: &str) -> Document {
    for _ in 0..500 {
        let doc = store.get_document(id).await.unwrap().unwrap();
        if doc.status != DocStatus::Indexing {
            return doc;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("document {id} never reached a terminal status");
}

fn upload(name: &str, text: &str) -> UploadRequest {
    UploadRequest {
        file_name: name.to_string(),
        bytes: text.as_bytes().to_vec(),
    }
}

const PARIS_TEXT: &str = "Paris is the capital of France. The Eiffel Tower is in Paris.";

#[tokio::test]
async fn upload_rejects_invalid_input() {
    let store = Arc::new(InMemoryStore::new());
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new());
    let config = Config::default();

    let err = upload_document(
        Arc::clone(&store),
        Arc::clone(&embedder),
        &config,
        upload("report.pdf", "text"),
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = upload_document(
        Arc::clone(&store),
        Arc::clone(&embedder),
        &config,
        upload("empty.txt", "   \n  "),
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let oversized = vec![b'a'; config.upload.max_upload_bytes + 1];
    let err = upload_document(
        Arc::clone(&store),
        embedder,
        &config,
        UploadRequest {
            file_name: "big.txt".into(),
            bytes: oversized,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert!(store.list_documents().await.unwrap().is_empty());
}

#[tokio::test]
async fn upload_acknowledges_before_indexing_completes() {
    let store = Arc::new(InMemoryStore::new());
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new());
    let config = Config::default();

    let doc = upload_document(
        Arc::clone(&store),
        embedder,
        &config,
        upload("paris.txt", PARIS_TEXT),
    )
    .await
    .unwrap();

    assert_eq!(doc.status, DocStatus::Indexing);
    assert_eq!(doc.num_chunks, 0);
    assert!(!doc.storage_path.is_empty());

    let done = wait_for_terminal(&store, &doc.id).await;
    assert_eq!(done.status, DocStatus::Ready);
    assert_eq!(done.num_chunks, 1);
}

#[tokio::test]
async fn ready_document_chunk_count_matches_store() {
    let store = Arc::new(InMemoryStore::new());
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new());
    let mut config = Config::default();
    config.chunking = ChunkingConfig {
        target_chars: 100,
        overlap_chars: 20,
        max_chunk_chars: 100,
    };
    config.indexing = IndexingConfig { batch_size: 3 };

    let text = "abcdefghij".repeat(50); // 500 chars, several chunks
    let doc = upload_document(
        Arc::clone(&store),
        embedder,
        &config,
        upload("long.txt", &text),
    )
    .await
    .unwrap();

    let done = wait_for_terminal(&store, &doc.id).await;
    assert_eq!(done.status, DocStatus::Ready);
    assert!(done.num_chunks > 1);

    let stored = store
        .chunk_ids_for_document(&doc.id, usize::MAX)
        .await
        .unwrap();
    assert_eq!(stored.len() as u32, done.num_chunks);
}

#[tokio::test]
async fn embedding_failure_marks_error_and_keeps_committed_chunks() {
    let store = Arc::new(InMemoryStore::new());
    // each chunk commits in its own batch; the third embedding call fails
    let embedder: Arc<dyn Embedder> = Arc::new(FailingEmbedder::failing_from(3));
    let mut config = Config::default();
    config.chunking = ChunkingConfig {
        target_chars: 100,
        overlap_chars: 10,
        max_chunk_chars: 100,
    };
    config.indexing = IndexingConfig { batch_size: 1 };

    let text = "abcdefghij".repeat(60); // 600 chars -> at least 4 segments
    let doc = upload_document(
        Arc::clone(&store),
        embedder,
        &config,
        upload("doomed.txt", &text),
    )
    .await
    .unwrap();

    let done = wait_for_terminal(&store, &doc.id).await;
    assert_eq!(done.status, DocStatus::Error);
    assert!(done.error.unwrap().contains("embedding service unavailable"));

    // the two chunks embedded before the failure stay committed
    let stored = store
        .chunk_ids_for_document(&doc.id, usize::MAX)
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn index_document_reports_segment_count() {
    let store = InMemoryStore::new();
    let embedder = HashEmbedder::new();
    let doc = store
        .create_document(NewDocument {
            name: "n.txt".into(),
            size: 0,
            mime: "text/plain".into(),
        })
        .await
        .unwrap();

    let chunking = ChunkingConfig {
        target_chars: 1000,
        overlap_chars: 200,
        max_chunk_chars: 700,
    };
    let indexing = IndexingConfig { batch_size: 50 };
    let text = "x".repeat(1500); // two segments at 1000/200

    let count = index_document(&store, &embedder, &chunking, &indexing, &doc.id, &text)
        .await
        .unwrap();
    assert_eq!(count, 2);
    assert_eq!(
        store.get_document(&doc.id).await.unwrap().unwrap().num_chunks,
        2
    );
}

#[tokio::test]
async fn delete_cascades_and_is_idempotent() {
    let store = Arc::new(InMemoryStore::new());
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new());
    let mut config = Config::default();
    config.chunking = ChunkingConfig {
        target_chars: 50,
        overlap_chars: 5,
        max_chunk_chars: 50,
    };
    // exercise more than one delete round
    config.store.delete_batch_size = 2;

    let text = "abcdefghij".repeat(40);
    let doc = upload_document(
        Arc::clone(&store),
        embedder,
        &config,
        upload("gone.txt", &text),
    )
    .await
    .unwrap();
    wait_for_terminal(&store, &doc.id).await;

    delete_document(&*store, config.store.delete_batch_size, &doc.id)
        .await
        .unwrap();

    assert!(store.get_document(&doc.id).await.unwrap().is_none());
    assert!(store
        .chunk_ids_for_document(&doc.id, usize::MAX)
        .await
        .unwrap()
        .is_empty());
    assert!(store.file_part_idxs(&doc.id, usize::MAX).await.unwrap().is_empty());
    assert!(store.list_previews().await.unwrap().is_empty());

    // second run is a no-op success
    delete_document(&*store, config.store.delete_batch_size, &doc.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn fallback_contexts_come_only_from_lexical_search() {
    let store = InMemoryStore::new();
    let embedder = HashEmbedder::new();
    let model = ScriptedModel::new(&[
        "Zebras roam the savanna [#1].",
        r#"{"score":0.6,"missing":[],"reasons":[]}"#,
    ]);

    // a document with a preview but no indexed chunks
    let doc = store
        .create_document(NewDocument {
            name: "animals.txt".into(),
            size: 24,
            mime: "text/plain".into(),
        })
        .await
        .unwrap();
    store
        .put_file_record(
            &doc.id,
            &FileRecord {
                preview: "zebras roam the savanna all year".into(),
                parts_count: 1,
                mime: "text/plain".into(),
                created_at: Utc::now(),
            },
        )
        .await
        .unwrap();

    let response = answer_query(
        &store,
        &embedder,
        &model,
        &RetrievalConfig::default(),
        &QueryRequest::new("where do zebras roam?"),
    )
    .await
    .unwrap();

    assert!(!response.contexts.is_empty());
    for passage in &response.contexts {
        assert!(passage.id.starts_with("lex-"));
        assert_eq!(passage.doc_id, doc.id);
        assert_eq!(passage.doc_name, "animals.txt");
    }
}

#[tokio::test]
async fn empty_store_returns_fixed_low_score_response() {
    let store = InMemoryStore::new();
    let embedder = HashEmbedder::new();
    let model = ScriptedModel::new(&[]);

    let response = answer_query(
        &store,
        &embedder,
        &model,
        &RetrievalConfig::default(),
        &QueryRequest::new("what is in my documents?"),
    )
    .await
    .unwrap();

    assert_eq!(response.answer, NO_CONTEXT_ANSWER);
    assert!(response.contexts.is_empty());
    assert_eq!(response.completeness.score, 0.2);
    assert!(!response.completeness.missing.is_empty());
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn missing_question_is_a_validation_error() {
    let store = InMemoryStore::new();
    let embedder = HashEmbedder::new();
    let model = ScriptedModel::new(&[]);

    let err = answer_query(
        &store,
        &embedder,
        &model,
        &RetrievalConfig::default(),
        &QueryRequest::new("   "),
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn paris_end_to_end() {
    let store = Arc::new(InMemoryStore::new());
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new());
    let config = Config::default();
    let model = ScriptedModel::new(&[
        "The capital of France is Paris [#1].",
        r#"{"score":0.9,"missing":[],"reasons":["Directly supported by the context"]}"#,
    ]);

    let doc = upload_document(
        Arc::clone(&store),
        Arc::clone(&embedder),
        &config,
        upload("paris.txt", PARIS_TEXT),
    )
    .await
    .unwrap();
    assert_eq!(doc.status, DocStatus::Indexing);

    let done = wait_for_terminal(&store, &doc.id).await;
    assert_eq!(done.status, DocStatus::Ready);
    assert_eq!(done.num_chunks, 1);

    let response = answer_query(
        &*store,
        &*embedder,
        &model,
        &config.retrieval,
        &QueryRequest::new("What is the capital of France?"),
    )
    .await
    .unwrap();

    assert!(response.answer.contains("Paris"));
    assert!(!response.contexts.is_empty());
    assert_eq!(response.contexts[0].doc_id, doc.id);
    assert_eq!(response.contexts[0].doc_name, "paris.txt");
    assert!(response.completeness.score >= 0.5);
    assert_eq!(model.call_count(), 2);
}
