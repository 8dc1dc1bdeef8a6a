//! Storage abstraction for docqa.
//!
//! The [`Store`] trait defines every persistence operation the ingestion,
//! retrieval, and deletion pipelines need, enabling pluggable backends
//! (SQLite, in-memory). Implementations must be `Send + Sync`.
//!
//! Batch operations are atomic: all records in one call commit or fail
//! together. There is no cross-call atomicity — that boundary is the
//! pipelines' consistency model.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`create_document`](Store::create_document) | Insert a document, assigning identity and storage path |
//! | [`get_document`](Store::get_document) / [`list_documents`](Store::list_documents) | Document lookup and listing |
//! | [`mark_document_ready`](Store::mark_document_ready) / [`mark_document_error`](Store::mark_document_error) | Terminal status transitions |
//! | [`put_file_record`](Store::put_file_record) / [`put_file_part`](Store::put_file_part) | Raw-text storage |
//! | [`list_previews`](Store::list_previews) | Cached previews for the lexical fallback |
//! | [`insert_chunks`](Store::insert_chunks) | Atomic chunk batch commit |
//! | [`nearest_chunks`](Store::nearest_chunks) | Vector similarity search |
//! | [`chunk_ids_for_document`](Store::chunk_ids_for_document) / [`delete_chunks`](Store::delete_chunks) | Batched cascade over chunks |
//! | [`file_part_idxs`](Store::file_part_idxs) / [`delete_file_parts`](Store::delete_file_parts) | Batched cascade over file parts |
//! | [`delete_document_and_file`](Store::delete_document_and_file) | Final atomic removal of the parent records |

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{ChunkRecord, Document, FilePart, FileRecord, NewDocument};

/// Distance metric for nearest-neighbour search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMeasure {
    #[default]
    Cosine,
    Euclidean,
    DotProduct,
}

/// One nearest-neighbour hit, in the index's native ranking order.
#[derive(Debug, Clone)]
pub struct ChunkHit {
    /// Store-assigned chunk id.
    pub id: String,
    pub doc_id: String,
    /// The chunk's position within its document.
    pub order: u32,
    pub text: String,
    /// Ranking score under the requested measure. Higher is always
    /// better; euclidean distances are negated.
    pub score: f64,
}

/// A document's cached preview text, for the lexical fallback.
#[derive(Debug, Clone)]
pub struct PreviewRecord {
    pub doc_id: String,
    pub preview: String,
}

/// Abstract storage backend for docqa.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a new document with `indexing` status, assigning its
    /// identity, storage path, and upload timestamp. Returns the stored
    /// record.
    async fn create_document(&self, new: NewDocument) -> Result<Document>;

    /// Retrieve a document by id.
    async fn get_document(&self, id: &str) -> Result<Option<Document>>;

    /// All documents, most recently uploaded first.
    async fn list_documents(&self) -> Result<Vec<Document>>;

    /// Terminal transition: indexing finished with `num_chunks` committed.
    async fn mark_document_ready(&self, id: &str, num_chunks: u32) -> Result<()>;

    /// Terminal transition: indexing aborted with the captured message.
    async fn mark_document_error(&self, id: &str, message: &str) -> Result<()>;

    /// Store the raw-text record (preview and part count) for a document.
    async fn put_file_record(&self, doc_id: &str, record: &FileRecord) -> Result<()>;

    /// Store one raw-text shard.
    async fn put_file_part(&self, doc_id: &str, part: &FilePart) -> Result<()>;

    /// Cached previews of every stored file.
    async fn list_previews(&self) -> Result<Vec<PreviewRecord>>;

    /// Commit a batch of chunks atomically, assigning record identities.
    async fn insert_chunks(&self, chunks: &[ChunkRecord]) -> Result<()>;

    /// The `k` nearest chunks to `query` under `measure`, best first.
    async fn nearest_chunks(
        &self,
        query: &[f32],
        k: usize,
        measure: DistanceMeasure,
    ) -> Result<Vec<ChunkHit>>;

    /// Up to `limit` chunk ids belonging to a document.
    async fn chunk_ids_for_document(&self, doc_id: &str, limit: usize) -> Result<Vec<String>>;

    /// Delete the given chunks in one atomic batch.
    async fn delete_chunks(&self, ids: &[String]) -> Result<()>;

    /// Up to `limit` file-part indices belonging to a document.
    async fn file_part_idxs(&self, doc_id: &str, limit: usize) -> Result<Vec<u32>>;

    /// Delete the given file parts in one atomic batch.
    async fn delete_file_parts(&self, doc_id: &str, idxs: &[u32]) -> Result<()>;

    /// Delete the document and its file record together, atomically.
    async fn delete_document_and_file(&self, doc_id: &str) -> Result<()>;
}
