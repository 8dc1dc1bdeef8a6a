//! SQLite-backed [`Store`] implementation.
//!
//! Transactions are the atomic-batch boundary: every multi-record write
//! or delete runs inside one transaction and commits or fails whole.
//! Vector search is a brute-force similarity scan over the stored
//! embedding BLOBs, ranked in process.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use docqa_core::embedding::{blob_to_vec, cosine_similarity, dot_product, euclidean_distance, vec_to_blob};
use docqa_core::models::{ChunkRecord, DocStatus, Document, FilePart, FileRecord, NewDocument};
use docqa_core::store::{ChunkHit, DistanceMeasure, PreviewRecord, Store};

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn timestamp_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<Document> {
    let status_raw: String = row.get("status");
    let status = DocStatus::parse(&status_raw)
        .ok_or_else(|| anyhow::anyhow!("unknown document status: {status_raw}"))?;
    let size: i64 = row.get("size");
    let num_chunks: i64 = row.get("num_chunks");
    Ok(Document {
        id: row.get("id"),
        name: row.get("name"),
        size: size as u64,
        mime: row.get("mime"),
        storage_path: row.get("storage_path"),
        uploaded_at: timestamp_to_datetime(row.get("uploaded_at")),
        status,
        num_chunks: num_chunks as u32,
        error: row.get("error"),
    })
}

fn rank_score(measure: DistanceMeasure, query: &[f32], candidate: &[f32]) -> f64 {
    match measure {
        DistanceMeasure::Cosine => cosine_similarity(query, candidate) as f64,
        DistanceMeasure::DotProduct => dot_product(query, candidate) as f64,
        DistanceMeasure::Euclidean => -(euclidean_distance(query, candidate) as f64),
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_document(&self, new: NewDocument) -> Result<Document> {
        let id = Uuid::new_v4().to_string();
        let doc = Document {
            storage_path: format!("sqlite://files/{id}"),
            id: id.clone(),
            name: new.name,
            size: new.size,
            mime: new.mime,
            uploaded_at: Utc::now(),
            status: DocStatus::Indexing,
            num_chunks: 0,
            error: None,
        };

        sqlx::query(
            r#"
            INSERT INTO documents (id, name, size, mime, storage_path, uploaded_at, status, num_chunks, error)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.name)
        .bind(doc.size as i64)
        .bind(&doc.mime)
        .bind(&doc.storage_path)
        .bind(doc.uploaded_at.timestamp_millis())
        .bind(doc.status.as_str())
        .bind(doc.num_chunks as i64)
        .execute(&self.pool)
        .await?;

        Ok(doc)
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_document(&r)).transpose()
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let rows = sqlx::query("SELECT * FROM documents ORDER BY uploaded_at DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_document).collect()
    }

    async fn mark_document_ready(&self, id: &str, num_chunks: u32) -> Result<()> {
        let result = sqlx::query(
            "UPDATE documents SET status = 'ready', num_chunks = ?, error = NULL WHERE id = ?",
        )
        .bind(num_chunks as i64)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("document {id} does not exist");
        }
        Ok(())
    }

    async fn mark_document_error(&self, id: &str, message: &str) -> Result<()> {
        let result = sqlx::query("UPDATE documents SET status = 'error', error = ? WHERE id = ?")
            .bind(message)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("document {id} does not exist");
        }
        Ok(())
    }

    async fn put_file_record(&self, doc_id: &str, record: &FileRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO files (doc_id, preview, parts_count, mime, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(doc_id) DO UPDATE SET
                preview = excluded.preview,
                parts_count = excluded.parts_count,
                mime = excluded.mime,
                created_at = excluded.created_at
            "#,
        )
        .bind(doc_id)
        .bind(&record.preview)
        .bind(record.parts_count as i64)
        .bind(&record.mime)
        .bind(record.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn put_file_part(&self, doc_id: &str, part: &FilePart) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO file_parts (doc_id, idx, content) VALUES (?, ?, ?)
            ON CONFLICT(doc_id, idx) DO UPDATE SET content = excluded.content
            "#,
        )
        .bind(doc_id)
        .bind(part.idx as i64)
        .bind(&part.content)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_previews(&self) -> Result<Vec<PreviewRecord>> {
        let rows = sqlx::query("SELECT doc_id, preview FROM files")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| PreviewRecord {
                doc_id: row.get("doc_id"),
                preview: row.get("preview"),
            })
            .collect())
    }

    async fn insert_chunks(&self, chunks: &[ChunkRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for chunk in chunks {
            sqlx::query(
                r#"
                INSERT INTO chunks (id, doc_id, page, chunk_order, text, embedding, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&chunk.doc_id)
            .bind(chunk.page as i64)
            .bind(chunk.order as i64)
            .bind(&chunk.text)
            .bind(vec_to_blob(&chunk.embedding))
            .bind(chunk.created_at.timestamp_millis())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn nearest_chunks(
        &self,
        query: &[f32],
        k: usize,
        measure: DistanceMeasure,
    ) -> Result<Vec<ChunkHit>> {
        let rows = sqlx::query("SELECT id, doc_id, chunk_order, text, embedding FROM chunks")
            .fetch_all(&self.pool)
            .await?;

        let mut hits: Vec<ChunkHit> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vector = blob_to_vec(&blob);
                let order: i64 = row.get("chunk_order");
                ChunkHit {
                    id: row.get("id"),
                    doc_id: row.get("doc_id"),
                    order: order as u32,
                    text: row.get("text"),
                    score: rank_score(measure, query, &vector),
                }
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
        let rows = sqlx::query("SELECT id FROM chunks WHERE doc_id = ? LIMIT ?")
            .bind(doc_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    async fn delete_chunks(&self, ids: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for id in ids {
            sqlx::query("DELETE FROM chunks WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn file_part_idxs(&self, doc_id: &str, limit: usize) -> Result<Vec<u32>> {
        let rows = sqlx::query("SELECT idx FROM file_parts WHERE doc_id = ? LIMIT ?")
            .bind(doc_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| {
                let idx: i64 = row.get("idx");
                idx as u32
            })
            .collect())
    }

    async fn delete_file_parts(&self, doc_id: &str, idxs: &[u32]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for idx in idxs {
            sqlx::query("DELETE FROM file_parts WHERE doc_id = ? AND idx = ?")
                .bind(doc_id)
                .bind(*idx as i64)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete_document_and_file(&self, doc_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM files WHERE doc_id = ?")
            .bind(doc_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(doc_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
