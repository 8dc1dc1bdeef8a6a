//! Core data models used throughout docqa.
//!
//! These types represent the documents, raw-text records, chunks, and
//! query responses that flow through the ingestion and retrieval pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a document's index.
///
/// A document is created as `indexing` and moved exactly once, by the
/// background indexer, to one of the two terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocStatus {
    /// Background indexing is still running.
    Indexing,
    /// Indexing finished; `num_chunks` reflects the committed chunk count.
    Ready,
    /// Indexing aborted; the document's `error` field carries the message.
    Error,
}

impl DocStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocStatus::Indexing => "indexing",
            DocStatus::Ready => "ready",
            DocStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "indexing" => Some(DocStatus::Indexing),
            "ready" => Some(DocStatus::Ready),
            "error" => Some(DocStatus::Error),
            _ => None,
        }
    }
}

/// Document metadata as stored.
///
/// Created on upload acceptance; only the status, chunk count, and error
/// fields are ever mutated afterwards, and only by the indexer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub mime: String,
    pub storage_path: String,
    pub uploaded_at: DateTime<Utc>,
    pub status: DocStatus,
    pub num_chunks: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Upload-time fields of a new document. The store assigns the identity,
/// the storage path, the timestamp, and the `indexing` status on insert.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub name: String,
    pub size: u64,
    pub mime: String,
}

/// Raw-text metadata for one document, holding the bounded preview used
/// by the lexical fallback. Owned by the document; same lifecycle.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub preview: String,
    pub parts_count: u32,
    pub mime: String,
    pub created_at: DateTime<Utc>,
}

/// One ordered shard of a document's raw text. Immutable once written.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub idx: u32,
    pub content: String,
}

/// An embedded chunk ready for an atomic batch commit.
///
/// `doc_id` is a lookup-only reference to the parent document. The store
/// assigns record identities on insert; chunks are never mutated.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub doc_id: String,
    pub page: u32,
    pub order: u32,
    pub text: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// A retrieved context passage, named and ordered for citation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextPassage {
    pub id: String,
    pub doc_id: String,
    pub doc_name: String,
    pub order: u32,
    pub text: String,
}

/// Self-assessed completeness of a generated answer.
#[derive(Debug, Clone, Serialize)]
pub struct Completeness {
    /// Coverage score in `[0.0, 1.0]`.
    pub score: f64,
    /// Information the judge found missing from the answer.
    pub missing: Vec<String>,
    /// The judge's reasoning.
    pub reasons: Vec<String>,
}

/// Full response to a question.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub contexts: Vec<ContextPassage>,
    pub completeness: Completeness,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        for status in [DocStatus::Indexing, DocStatus::Ready, DocStatus::Error] {
            assert_eq!(DocStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DocStatus::parse("pending"), None);
    }

    #[test]
    fn context_passage_serializes_camel_case() {
        let passage = ContextPassage {
            id: "c1".into(),
            doc_id: "d1".into(),
            doc_name: "notes.txt".into(),
            order: 0,
            text: "hello".into(),
        };
        let json = serde_json::to_value(&passage).unwrap();
        assert_eq!(json["docId"], "d1");
        assert_eq!(json["docName"], "notes.txt");
    }
}
