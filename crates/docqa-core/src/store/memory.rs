//! In-memory [`Store`] implementation for tests and embedded use.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock` for thread safety.
//! Vector search is brute-force similarity over all stored chunks.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::embedding::{cosine_similarity, dot_product, euclidean_distance};
use crate::models::{ChunkRecord, DocStatus, Document, FilePart, FileRecord, NewDocument};

use super::{ChunkHit, DistanceMeasure, PreviewRecord, Store};

struct StoredChunk {
    id: String,
    record: ChunkRecord,
}

/// In-memory store. Every collection lives behind its own lock, matching
/// the per-collection write granularity of the SQLite backend.
#[derive(Default)]
pub struct InMemoryStore {
    docs: RwLock<HashMap<String, Document>>,
    files: RwLock<HashMap<String, FileRecord>>,
    parts: RwLock<HashMap<String, Vec<FilePart>>>,
    chunks: RwLock<Vec<StoredChunk>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Ranking score under `measure`, higher-is-better.
fn rank_score(measure: DistanceMeasure, query: &[f32], candidate: &[f32]) -> f64 {
    match measure {
        DistanceMeasure::Cosine => cosine_similarity(query, candidate) as f64,
        DistanceMeasure::DotProduct => dot_product(query, candidate) as f64,
        DistanceMeasure::Euclidean => -(euclidean_distance(query, candidate) as f64),
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_document(&self, new: NewDocument) -> Result<Document> {
        let id = Uuid::new_v4().to_string();
        let doc = Document {
            storage_path: format!("mem://files/{id}"),
            id: id.clone(),
            name: new.name,
            size: new.size,
            mime: new.mime,
            uploaded_at: Utc::now(),
            status: DocStatus::Indexing,
            num_chunks: 0,
            error: None,
        };
        self.docs.write().unwrap().insert(id, doc.clone());
        Ok(doc)
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.docs.read().unwrap().get(id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let mut docs: Vec<Document> = self.docs.read().unwrap().values().cloned().collect();
        docs.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(docs)
    }

    async fn mark_document_ready(&self, id: &str, num_chunks: u32) -> Result<()> {
        let mut docs = self.docs.write().unwrap();
        let doc = docs
            .get_mut(id)
            .ok_or_else(|| anyhow::anyhow!("document {id} does not exist"))?;
        doc.status = DocStatus::Ready;
        doc.num_chunks = num_chunks;
        doc.error = None;
        Ok(())
    }

    async fn mark_document_error(&self, id: &str, message: &str) -> Result<()> {
        let mut docs = self.docs.write().unwrap();
        let doc = docs
            .get_mut(id)
            .ok_or_else(|| anyhow::anyhow!("document {id} does not exist"))?;
        doc.status = DocStatus::Error;
        doc.error = Some(message.to_string());
        Ok(())
    }

    async fn put_file_record(&self, doc_id: &str, record: &FileRecord) -> Result<()> {
        self.files
            .write()
            .unwrap()
            .insert(doc_id.to_string(), record.clone());
        Ok(())
    }

    async fn put_file_part(&self, doc_id: &str, part: &FilePart) -> Result<()> {
        self.parts
            .write()
            .unwrap()
            .entry(doc_id.to_string())
            .or_default()
            .push(part.clone());
        Ok(())
    }

    async fn list_previews(&self) -> Result<Vec<PreviewRecord>> {
        Ok(self
            .files
            .read()
            .unwrap()
            .iter()
            .map(|(doc_id, record)| PreviewRecord {
                doc_id: doc_id.clone(),
                preview: record.preview.clone(),
            })
            .collect())
    }

    async fn insert_chunks(&self, chunks: &[ChunkRecord]) -> Result<()> {
        let mut stored = self.chunks.write().unwrap();
        for record in chunks {
            stored.push(StoredChunk {
                id: Uuid::new_v4().to_string(),
                record: record.clone(),
            });
        }
        Ok(())
    }

    async fn nearest_chunks(
        &self,
        query: &[f32],
        k: usize,
        measure: DistanceMeasure,
    ) -> Result<Vec<ChunkHit>> {
        let stored = self.chunks.read().unwrap();
        let mut hits: Vec<ChunkHit> = stored
            .iter()
            .map(|sc| ChunkHit {
                id: sc.id.clone(),
                doc_id: sc.record.doc_id.clone(),
                order: sc.record.order,
                text: sc.record.text.clone(),
                score: rank_score(measure, query, &sc.record.embedding),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn chunk_ids_for_document(&self, doc_id: &str, limit: usize) -> Result<Vec<String>> {
        Ok(self
            .chunks
            .read()
            .unwrap()
            .iter()
            .filter(|sc| sc.record.doc_id == doc_id)
            .take(limit)
            .map(|sc| sc.id.clone())
            .collect())
    }

    async fn delete_chunks(&self, ids: &[String]) -> Result<()> {
        self.chunks
            .write()
            .unwrap()
            .retain(|sc| !ids.contains(&sc.id));
        Ok(())
    }

    async fn file_part_idxs(&self, doc_id: &str, limit: usize) -> Result<Vec<u32>> {
        Ok(self
            .parts
            .read()
            .unwrap()
            .get(doc_id)
            .map(|parts| parts.iter().take(limit).map(|p| p.idx).collect())
            .unwrap_or_default())
    }

    async fn delete_file_parts(&self, doc_id: &str, idxs: &[u32]) -> Result<()> {
        let mut parts = self.parts.write().unwrap();
        if let Some(list) = parts.get_mut(doc_id) {
            list.retain(|p| !idxs.contains(&p.idx));
            if list.is_empty() {
                parts.remove(doc_id);
            }
        }
        Ok(())
    }

    async fn delete_document_and_file(&self, doc_id: &str) -> Result<()> {
        self.files.write().unwrap().remove(doc_id);
        self.docs.write().unwrap().remove(doc_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(doc_id: &str, order: u32, embedding: Vec<f32>) -> ChunkRecord {
        ChunkRecord {
            doc_id: doc_id.to_string(),
            page: 0,
            order,
            text: format!("chunk {order}"),
            embedding,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_assigns_identity_and_storage_path() {
        let store = InMemoryStore::new();
        let doc = store
            .create_document(NewDocument {
                name: "a.txt".into(),
                size: 3,
                mime: "text/plain".into(),
            })
            .await
            .unwrap();
        assert!(!doc.id.is_empty());
        assert_eq!(doc.storage_path, format!("mem://files/{}", doc.id));
        assert_eq!(doc.status, DocStatus::Indexing);
        assert_eq!(doc.num_chunks, 0);
    }

    #[tokio::test]
    async fn nearest_chunks_ranks_by_cosine() {
        let store = InMemoryStore::new();
        store
            .insert_chunks(&[
                chunk("d1", 0, vec![1.0, 0.0]),
                chunk("d1", 1, vec![0.0, 1.0]),
                chunk("d1", 2, vec![0.7, 0.7]),
            ])
            .await
            .unwrap();

        let hits = store
            .nearest_chunks(&[1.0, 0.0], 2, DistanceMeasure::Cosine)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].order, 0);
        assert_eq!(hits[1].order, 2);
    }

    #[tokio::test]
    async fn euclidean_ranks_nearest_first() {
        let store = InMemoryStore::new();
        store
            .insert_chunks(&[
                chunk("d1", 0, vec![10.0, 0.0]),
                chunk("d1", 1, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let hits = store
            .nearest_chunks(&[0.0, 0.0], 2, DistanceMeasure::Euclidean)
            .await
            .unwrap();
        assert_eq!(hits[0].order, 1);
    }

    #[tokio::test]
    async fn list_documents_is_newest_first() {
        let store = InMemoryStore::new();
        for name in ["a.txt", "b.txt", "c.txt"] {
            store
                .create_document(NewDocument {
                    name: name.into(),
                    size: 1,
                    mime: "text/plain".into(),
                })
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        let docs = store.list_documents().await.unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].name, "c.txt");
        assert_eq!(docs[2].name, "a.txt");
    }
}
